use option_ledger_core::LedgerStore;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Which options a task works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    All,
    /// One option by exact name.
    Option(String),
    /// Options whose name contains the keyword, ignoring case.
    Keyword(String),
}

impl Selection {
    /// Names of the selected options, sorted.
    ///
    /// `All` on an empty ledger resolves to no names.
    ///
    /// # Errors
    /// - [`TaskError::Ledger`] if a named option does not exist
    /// - [`TaskError::NoMatch`] if a keyword matches nothing
    pub fn resolve(&self, ledger: &LedgerStore) -> Result<Vec<String>, TaskError> {
        match self {
            Self::All => Ok(ledger.names()),
            Self::Option(name) => {
                ledger.require(name)?;
                Ok(vec![name.clone()])
            }
            Self::Keyword(keyword) => {
                let names = ledger.names_matching(keyword);
                if names.is_empty() {
                    return Err(TaskError::no_match(keyword.as_str()));
                }
                Ok(names)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use option_ledger_core::{LedgerError, OptionTerms};

    fn ledger() -> LedgerStore {
        let mut ledger = LedgerStore::new();
        for name in ["Soymeal-Call", "soymeal-put", "iron-put"] {
            ledger
                .create(
                    name,
                    OptionTerms {
                        code: "m2601".to_string(),
                        strike_price: 3000.0,
                        initial_amount: 100.0,
                        trade_dates: vec![NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()],
                    },
                    false,
                )
                .unwrap();
        }
        ledger
    }

    #[test]
    fn keyword_matches_case_insensitively() {
        let names = Selection::Keyword("SOYMEAL".to_string())
            .resolve(&ledger())
            .unwrap();
        assert_eq!(names, vec!["Soymeal-Call".to_string(), "soymeal-put".to_string()]);
    }

    #[test]
    fn keyword_without_match_fails() {
        let err = Selection::Keyword("corn".to_string())
            .resolve(&ledger())
            .unwrap_err();
        assert!(matches!(err, TaskError::NoMatch { keyword } if keyword == "corn"));
    }

    #[test]
    fn unknown_option_fails() {
        let err = Selection::Option("corn".to_string())
            .resolve(&ledger())
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Ledger(LedgerError::OptionNotFound { .. })
        ));
    }

    #[test]
    fn all_on_empty_ledger_is_empty() {
        assert!(Selection::All.resolve(&LedgerStore::new()).unwrap().is_empty());
        assert_eq!(Selection::All.resolve(&ledger()).unwrap().len(), 3);
    }
}
