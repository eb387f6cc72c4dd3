//! Policy for the free-text "additional arguments" field.
//!
//! Tokens are split on whitespace and handed to the converter as separate
//! `argv` entries; no shell is involved. On top of that, every token must be
//! one of the converter options in [`KNOWN_OPTIONS`] (exact spelling, no
//! abbreviations) or the value of the value-taking option right before it:
//!
//! * tokens containing control characters are rejected;
//! * anything that names the output option (`-o`, `-oPATH`, `--out`,
//!   `--outp=PATH` …) is rejected because the Markdown must arrive on stdout;
//! * options that print information instead of converting are rejected;
//! * a bare token is only accepted as the value of an option that takes one,
//!   so the user cannot name extra input files;
//! * [`PLUGIN_FLAG`] (or `-p`) appears at most once, and not at all when the
//!   plugin checkbox already adds it.

use crate::error::DocmarkError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Flag that enables converter plugins.
pub const PLUGIN_FLAG: &str = "--use-plugins";

/// A converter option the extra-arguments field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownOption {
    pub short: Option<char>,
    pub long: &'static str,
    pub takes_value: bool,
}

/// Converter options accepted in the extra-arguments field.
pub const KNOWN_OPTIONS: &[KnownOption] = &[
    KnownOption { short: Some('x'), long: "extension", takes_value: true },
    KnownOption { short: Some('m'), long: "mime-type", takes_value: true },
    KnownOption { short: Some('c'), long: "charset", takes_value: true },
    KnownOption { short: Some('d'), long: "use-docintel", takes_value: false },
    KnownOption { short: Some('e'), long: "endpoint", takes_value: true },
    KnownOption { short: Some('p'), long: "use-plugins", takes_value: false },
    KnownOption { short: None, long: "keep-data-uris", takes_value: false },
];

/// Options that make the converter print something other than the document.
const INFO_OPTIONS: &[&str] = &["version", "list-plugins", "help"];

/// `-x`, `-xVALUE`
static SHORT_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-([A-Za-z])(.*)$").expect("valid regex"));

/// `--name`, `--name=VALUE`
static LONG_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--([A-Za-z][A-Za-z0-9-]*)(=(.*))?$").expect("valid regex"));

/// Split free text into tokens on any whitespace.
pub fn tokenize(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Apply the argument policy and return the tokens to append.
///
/// `plugins_flag_added` is true when the caller already appended
/// [`PLUGIN_FLAG`] because of the plugin checkbox.
pub fn sanitize(tokens: &[String], plugins_flag_added: bool) -> Result<Vec<String>, DocmarkError> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut plugin_seen = plugins_flag_added;
    let mut awaiting_value: Option<&str> = None;

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        if token.chars().any(char::is_control) {
            return Err(reject(token, "contains control characters"));
        }

        if let Some(option) = awaiting_value.take() {
            if token.starts_with('-') {
                return Err(reject(
                    token,
                    &format!("expected a value for '--{option}', found another option"),
                ));
            }
            out.push(token.clone());
            continue;
        }

        let (option, inline_value) = parse_option(token)?;

        if option.takes_value {
            match inline_value {
                Some("") => return Err(reject(token, "empty option value")),
                Some(_) => {}
                None => awaiting_value = Some(option.long),
            }
            out.push(token.clone());
            continue;
        }

        if inline_value.is_some() {
            return Err(reject(token, &format!("'--{}' takes no value", option.long)));
        }
        if option.long == "use-plugins" {
            if plugin_seen {
                continue;
            }
            plugin_seen = true;
            out.push(PLUGIN_FLAG.to_string());
            continue;
        }
        out.push(token.clone());
    }

    if let Some(option) = awaiting_value {
        return Err(reject(
            tokens.last().map(String::as_str).unwrap_or_default(),
            &format!("'--{option}' is missing its value"),
        ));
    }

    Ok(out)
}

/// Resolve an option token to its [`KnownOption`] plus any attached value.
fn parse_option(token: &str) -> Result<(&'static KnownOption, Option<&str>), DocmarkError> {
    if let Some(caps) = LONG_OPTION.captures(token) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        if "output".starts_with(name) {
            return Err(output_rejected(token));
        }
        if INFO_OPTIONS.contains(&name) {
            return Err(reject(token, "prints information instead of converting"));
        }
        let option = KNOWN_OPTIONS
            .iter()
            .find(|o| o.long == name)
            .ok_or_else(|| unknown(token))?;
        return Ok((option, caps.get(3).map(|m| m.as_str())));
    }

    if let Some(caps) = SHORT_OPTION.captures(token) {
        let letter = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .unwrap_or_default();
        if letter == 'o' {
            return Err(output_rejected(token));
        }
        if letter == 'v' || letter == 'h' {
            return Err(reject(token, "prints information instead of converting"));
        }
        let option = KNOWN_OPTIONS
            .iter()
            .find(|o| o.short == Some(letter))
            .ok_or_else(|| unknown(token))?;
        let attached = caps.get(2).map_or("", |m| m.as_str());
        return Ok((option, (!attached.is_empty()).then_some(attached)));
    }

    if token.starts_with('-') {
        return Err(unknown(token));
    }
    Err(reject(
        token,
        "positional arguments are not allowed; the uploaded file is the only input",
    ))
}

fn output_rejected(token: &str) -> DocmarkError {
    reject(
        token,
        "output redirection is not allowed; the Markdown is read from stdout",
    )
}

fn unknown(token: &str) -> DocmarkError {
    let allowed = KNOWN_OPTIONS
        .iter()
        .map(|o| format!("--{}", o.long))
        .collect::<Vec<_>>()
        .join(", ");
    reject(token, &format!("unknown option; allowed: {allowed}"))
}

fn reject(token: &str, reason: &str) -> DocmarkError {
    DocmarkError::RejectedArgument {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
