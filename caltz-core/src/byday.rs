//! Rewriting the `BYDAY` part of RRULE text.
//!
//! Only `BYDAY` values change. Every other rule part, and every non-rule line of a
//! multi-line block (`DTSTART`, `EXDATE`), is copied byte for byte.

use rrule::{RRule, Unvalidated};

use crate::error::{CalTzError, CalTzResult};
use crate::event::DayCode;

/// Shift every `BYDAY` weekday in `text` by `days`, wrapping around the week.
///
/// `text` may be a bare rule (`FREQ=WEEKLY;BYDAY=MO`), an `RRULE:` line, or a block of
/// lines containing one or more `RRULE:` lines. Ordinals (`1MO`, `-1FR`) are kept.
pub fn shift_byday(text: &str, days: i64) -> CalTzResult<String> {
    let mut found_rule = false;
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        let ending = &line[content.len()..];

        match rule_body(content) {
            Some((prefix, body)) => {
                found_rule = true;
                validate(body)?;
                out.push_str(prefix);
                out.push_str(&shift_rule(body, days)?);
            }
            None => out.push_str(content),
        }
        out.push_str(ending);
    }

    if !found_rule {
        return Err(CalTzError::InvalidRRule(format!("no rule found in '{text}'")));
    }

    Ok(out)
}

/// Split a line into its `RRULE:` prefix (possibly empty) and the rule parts.
pub(crate) fn rule_body(line: &str) -> Option<(&str, &str)> {
    if line
        .get(..6)
        .is_some_and(|name| name.eq_ignore_ascii_case("RRULE:"))
    {
        return Some(line.split_at(6));
    }

    if !line.contains(':') && line.contains('=') {
        return Some(("", line));
    }

    None
}

fn validate(body: &str) -> CalTzResult<()> {
    body.parse::<RRule<Unvalidated>>()
        .map(|_| ())
        .map_err(|e| CalTzError::InvalidRRule(format!("{body}: {e}")))
}

fn shift_rule(body: &str, days: i64) -> CalTzResult<String> {
    let parts = body
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("BYDAY") => {
                let tokens = value
                    .split(',')
                    .map(|token| shift_token(token, days))
                    .collect::<CalTzResult<Vec<_>>>()?;
                Ok(format!("{key}={}", tokens.join(",")))
            }
            _ => Ok(part.to_string()),
        })
        .collect::<CalTzResult<Vec<_>>>()?;

    Ok(parts.join(";"))
}

/// Shift one `[+-]?[0-9]{0,2}(MO|TU|WE|TH|FR|SA|SU)` token.
fn shift_token(token: &str, days: i64) -> CalTzResult<String> {
    let token = token.trim();
    let invalid = || CalTzError::InvalidRRule(format!("invalid BYDAY token '{token}'"));

    let split = token
        .len()
        .checked_sub(2)
        .filter(|&at| token.is_char_boundary(at))
        .ok_or_else(invalid)?;
    let (ordinal, weekday) = token.split_at(split);

    let digits = ordinal.strip_prefix(['+', '-']).unwrap_or(ordinal);
    if digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let day = DayCode::from_rrule_token(weekday).ok_or_else(invalid)?;
    Ok(format!("{ordinal}{}", day.shift(days).rrule_token()))
}
