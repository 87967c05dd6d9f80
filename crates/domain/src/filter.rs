//! shell 选择过滤器
//!
//! `*` 选择全部；否则为逗号分隔的 shell 名称或分组名称列表。

use std::fmt;

use shellz_core::{ShellzError, ShellzResult};

use crate::models::Shells;

/// 选择所有 shell 的通配符
pub const SELECT_ALL: &str = "*";

/// 按逗号拆分并去除空白，忽略空项
pub fn comma_split(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellFilter {
    All,
    Names(Vec<String>),
}

impl ShellFilter {
    pub fn parse(value: &str) -> Self {
        if value.trim() == SELECT_ALL {
            ShellFilter::All
        } else {
            ShellFilter::Names(comma_split(value))
        }
    }

    /// 从已加载的 shell 中选出子集
    ///
    /// 名称优先于分组；既不是 shell 名称也不是分组名称的项直接报错。
    pub fn select(&self, shells: &Shells) -> ShellzResult<Shells> {
        let selected = match self {
            ShellFilter::All => shells.clone(),
            ShellFilter::Names(names) => {
                let mut selected = Shells::new();
                for name in names {
                    if let Some(shell) = shells.get(name) {
                        selected.insert(name.clone(), shell.clone());
                        continue;
                    }

                    let mut group_hit = false;
                    for (shell_name, shell) in shells.iter().filter(|(_, s)| s.in_group(name)) {
                        selected.insert(shell_name.clone(), shell.clone());
                        group_hit = true;
                    }

                    if !group_hit {
                        return Err(ShellzError::ShellNotFound { name: name.clone() });
                    }
                }
                selected
            }
        };

        if selected.is_empty() {
            return Err(ShellzError::EmptySelection {
                filter: self.to_string(),
            });
        }
        Ok(selected)
    }
}

impl From<&str> for ShellFilter {
    fn from(value: &str) -> Self {
        ShellFilter::parse(value)
    }
}

impl fmt::Display for ShellFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellFilter::All => f.write_str(SELECT_ALL),
            ShellFilter::Names(names) => f.write_str(&names.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Shell, ShellType};

    fn shells(names: &[&str]) -> Shells {
        names
            .iter()
            .map(|n| (n.to_string(), Shell::new(*n, ShellType::Local)))
            .collect()
    }

    fn keys(shells: &Shells) -> Vec<&str> {
        shells.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_comma_split_trims() {
        assert_eq!(comma_split(" a, b ,,c,"), vec!["a", "b", "c"]);
        assert!(comma_split("").is_empty());
    }

    #[test]
    fn test_star_selects_everything() {
        let all = shells(&["a", "b", "c"]);
        let selected = ShellFilter::parse("*").select(&all).unwrap();
        assert_eq!(selected, all);
    }

    #[test]
    fn test_names_select_subset() {
        let all = shells(&["a", "b", "c"]);
        let selected = ShellFilter::parse("a,b").select(&all).unwrap();
        assert_eq!(keys(&selected), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let all = shells(&["a", "b", "c"]);
        let err = ShellFilter::parse("a,z").select(&all).unwrap_err();
        assert!(matches!(err, ShellzError::ShellNotFound { ref name } if name == "z"));
    }

    #[test]
    fn test_empty_selection_is_fatal() {
        let all = shells(&["a"]);
        let err = ShellFilter::parse(" , ").select(&all).unwrap_err();
        assert!(matches!(err, ShellzError::EmptySelection { .. }));

        let err = ShellFilter::All.select(&Shells::new()).unwrap_err();
        assert!(matches!(err, ShellzError::EmptySelection { ref filter } if filter == "*"));
    }

    #[test]
    fn test_group_selection() {
        let mut all = shells(&["a", "b"]);
        all.insert(
            "web1".to_string(),
            Shell::new("web1", ShellType::Local).with_groups(["web"]),
        );
        all.insert(
            "web2".to_string(),
            Shell::new("web2", ShellType::Local).with_groups(["web", "eu"]),
        );

        let selected = ShellFilter::parse("web,a").select(&all).unwrap();
        assert_eq!(keys(&selected), vec!["a", "web1", "web2"]);

        let selected = ShellFilter::parse("eu").select(&all).unwrap();
        assert_eq!(keys(&selected), vec!["web2"]);
    }

    #[test]
    fn test_duplicate_names_selected_once() {
        let all = shells(&["a", "b"]);
        let selected = ShellFilter::parse("a,a").select(&all).unwrap();
        assert_eq!(selected.len(), 1);
    }
}
