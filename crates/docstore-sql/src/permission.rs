//! Row-level read ACL.
//!
//! Rows carry their read roles as a JSON array in `_read`. The filter turns
//! an [`Authorization`] into a condition over that column:
//!
//! - disabled: `1=1`
//! - enabled with no roles: `1=0`
//! - otherwise whatever the dialect renders for "any of these roles"
//!
//! MariaDB matches through a FULLTEXT index in boolean mode, so a row is
//! included whenever the tokenizer finds one of the role phrases in the
//! stored JSON. Punctuation the tokenizer treats as a word boundary can make
//! a role match more broadly than an exact comparison would. SQLite compares
//! array members exactly.

use crate::dialect::Dialect;
use crate::error::{AdapterError, Result};
use crate::model::Authorization;
use crate::statement::{qualified, Fragment};

const DELIMITER: char = '+';

/// Rejects roles that would break out of their boolean-mode phrase.
pub fn validate_role(role: &str) -> Result<()> {
    if role.contains(DELIMITER) || role.contains('"') {
        return Err(AdapterError::Validation(format!(
            "role '{role}' contains a reserved character ('+' or '\"')"
        )));
    }
    Ok(())
}

/// Roles wrapped in the `+` delimiter and space separated, ready to be
/// escaped and turned into quoted phrases.
pub fn boolean_mode_terms(roles: &[String]) -> String {
    roles
        .iter()
        .map(|role| format!("{DELIMITER}{role}{DELIMITER}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Condition restricting `table_main` rows to those `authorization` may read.
pub fn read_filter(dialect: &dyn Dialect, authorization: &Authorization) -> Result<Fragment> {
    let roles = match authorization {
        Authorization::Disabled => return Ok(Fragment::always_true()),
        Authorization::Roles(roles) if roles.is_empty() => return Ok(Fragment::always_false()),
        Authorization::Roles(roles) => roles,
    };

    for role in roles {
        validate_role(role)?;
    }

    dialect.permission_condition(&qualified("_read")?, roles)
}
