//! Command batch layout shared by the generator and the verifier.
//!
//! A batch is the command prefix followed by one call per recipient, calls
//! separated by the delimiter:
//!
//! ```text
//! starkli invoke <target> reward <identity> <amount> / <target> reward <identity> <amount>
//! ```

use serde::{Deserialize, Serialize};

use crate::export::tabular::TabularRow;
use crate::export::AirdropRow;

/// Positional fields of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallField {
    Target,
    Entrypoint,
    Identity,
    Amount,
}

pub struct InvokeSchema;

impl InvokeSchema {
    pub const COMMAND: &'static str = "starkli invoke";
    pub const ENTRYPOINT: &'static str = "reward";
    pub const DELIMITER: char = '/';
    pub const CALL_FIELDS: [CallField; 4] = [
        CallField::Target,
        CallField::Entrypoint,
        CallField::Identity,
        CallField::Amount,
    ];

    /// Position of `field` within a call
    pub fn position(field: CallField) -> usize {
        Self::CALL_FIELDS
            .iter()
            .position(|f| *f == field)
            .unwrap_or(Self::CALL_FIELDS.len())
    }

    /// Render one call in field order
    pub fn render_call(target: &str, identity: &str, amount: &str) -> String {
        Self::CALL_FIELDS
            .iter()
            .map(|field| match field {
                CallField::Target => target,
                CallField::Entrypoint => Self::ENTRYPOINT,
                CallField::Identity => identity,
                CallField::Amount => amount,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Join rendered calls behind the command prefix
    pub fn render_batch(calls: &[String]) -> String {
        let separator = format!(" {} ", Self::DELIMITER);
        format!("{} {}", Self::COMMAND, calls.join(&separator))
    }

    /// Split a batch into calls on the delimiter, then each call into
    /// whitespace-separated tokens. No call spans a delimiter.
    pub fn calls(text: &str) -> Vec<Vec<&str>> {
        text.split(Self::DELIMITER)
            .map(|call| call.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect()
    }

    pub fn is_entrypoint(token: &str) -> bool {
        token.eq_ignore_ascii_case(Self::ENTRYPOINT)
    }

    /// `0x` followed by at least one hex digit
    pub fn is_identity(token: &str) -> bool {
        token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .map_or(false, |d| !d.is_empty() && d.chars().all(|c| c.is_ascii_hexdigit()))
    }

    /// Unsigned decimal integer
    pub fn is_amount(token: &str) -> bool {
        !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
    }
}

/// One `reward` call recovered from a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeEntry {
    /// Identity as written in the batch
    pub identity: String,
    /// Integer amount as written in the batch
    #[serde(rename = "airdropAmount")]
    pub amount: String,
}

impl TabularRow for InvokeEntry {
    const HEADER: &'static [&'static str] = AirdropRow::HEADER;
}
