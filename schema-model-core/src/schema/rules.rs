//! Named string rules.
//!
//! Rules are looked up by name (`isEmail`, `isLength`, ...) and invoked with
//! the candidate string plus the extra arguments declared in the schema, e.g.
//! `["isLength", {"min": 2, "max": 20}]`. Names and option shapes follow the
//! validator.js conventions that front-end schemas are usually written in.
//!
//! Malformed rule arguments make the rule fail rather than error.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

/// A rule predicate: `(value, args) -> accepted`.
pub type RuleFn = dyn Fn(&str, &[Value]) -> bool + Send + Sync;

/// Registry of named rules consulted by the validator.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<RuleFn>>,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("RuleRegistry").field("rules", &names).finish()
    }
}

static BUILTIN: LazyLock<Arc<RuleRegistry>> =
    LazyLock::new(|| Arc::new(RuleRegistry::with_builtins()));

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry holding only the built-in rules.
    pub fn builtin() -> Arc<RuleRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// A fresh registry pre-populated with the built-in rules, ready for
    /// custom additions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("isEmail", |s, _| is_email(s));
        registry.register("isURL", is_url);
        registry.register("isUUID", is_uuid);
        registry.register("isISO8601", |s, _| is_iso8601(s));
        registry.register("isDate", is_date);
        registry.register("isLength", |s, args| {
            within_bounds(s.chars().count() as f64, args)
        });
        registry.register("isByteLength", |s, args| within_bounds(s.len() as f64, args));
        registry.register("isInt", is_int);
        registry.register("isFloat", is_float);
        registry.register("isNumeric", |s, _| NUMERIC.is_match(s));
        registry.register("isBoolean", |s, _| {
            matches!(s, "true" | "false" | "1" | "0")
        });
        registry.register("isAlpha", |s, _| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
        });
        registry.register("isAlphanumeric", |s, _| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
        });
        registry.register("isLowercase", |s, _| s == s.to_lowercase());
        registry.register("isUppercase", |s, _| s == s.to_uppercase());
        registry.register("isHexColor", |s, _| HEX_COLOR.is_match(s));
        registry.register("isHexadecimal", |s, _| HEXADECIMAL.is_match(s));
        registry.register("isIP", is_ip);
        registry.register("isJSON", |s, _| {
            matches!(
                serde_json::from_str::<Value>(s),
                Ok(Value::Object(_)) | Ok(Value::Array(_))
            )
        });
        registry.register("isEmpty", |s, _| s.is_empty());
        registry.register("equals", |s, args| {
            args.first().and_then(Value::as_str) == Some(s)
        });
        registry.register("contains", |s, args| {
            args.first()
                .and_then(Value::as_str)
                .is_some_and(|seed| s.contains(seed))
        });
        registry.register("isIn", is_in);
        registry.register("matches", matches_pattern);
        registry.register("isPostalCode", is_postal_code);
        registry
    }

    /// Registers (or replaces) a rule.
    pub fn register<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(name.into(), Arc::new(rule));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RuleFn>> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Runs a rule. `None` if no rule has that name.
    pub fn check(&self, name: &str, value: &str, args: &[Value]) -> Option<bool> {
        self.get(name).map(|rule| rule(value, args))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

// ============================================================
// Built-in rules
// ============================================================

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .expect("email pattern is valid")
});
static INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(0|[1-9][0-9]*)$").expect("int pattern is valid"));
static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?([0-9]+)?(\.[0-9]+)?([eE][-+]?[0-9]+)?$").expect("float pattern is valid")
});
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?([0-9]*\.)?[0-9]+$").expect("numeric pattern is valid"));
static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#?([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$")
        .expect("hex color pattern is valid")
});
static HEXADECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(0x|0h)?[0-9a-f]+$").expect("hexadecimal pattern is valid")
});

/// Reads a key from the options object passed as the first rule argument.
fn option<'a>(args: &'a [Value], key: &str) -> Option<&'a Value> {
    args.first().and_then(Value::as_object).and_then(|o| o.get(key))
}

/// Reads a scalar argument that may be given bare (`4`, `"4"`) or as
/// `{ "version": 4 }`.
fn version_arg(args: &[Value]) -> Option<String> {
    let raw = match args.first()? {
        Value::Object(_) => option(args, "version")?,
        other => other,
    };
    match raw {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Checks `{min, max}` bounds; absent options are unbounded.
fn within_bounds(n: f64, args: &[Value]) -> bool {
    let min = option(args, "min").map(Value::as_f64);
    let max = option(args, "max").map(Value::as_f64);
    match (min, max) {
        (Some(None), _) | (_, Some(None)) => false,
        (min, max) => {
            min.flatten().is_none_or(|m| n >= m) && max.flatten().is_none_or(|m| n <= m)
        }
    }
}

fn is_email(s: &str) -> bool {
    s.len() <= 254 && EMAIL.is_match(s)
}

fn is_url(s: &str, args: &[Value]) -> bool {
    let require_protocol = option(args, "require_protocol")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let protocols: Vec<&str> = option(args, "protocols")
        .and_then(Value::as_array)
        .map(|p| p.iter().filter_map(Value::as_str).collect())
        .unwrap_or_else(|| vec!["http", "https", "ftp"]);

    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    let candidate = if s.contains("://") {
        s.to_string()
    } else if require_protocol {
        return false;
    } else {
        format!("http://{}", s)
    };

    let Ok(url) = url::Url::parse(&candidate) else {
        return false;
    };
    if !protocols.contains(&url.scheme()) {
        return false;
    }
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost" || domain.contains('.'),
        Some(_) => true,
        None => false,
    }
}

fn is_uuid(s: &str, args: &[Value]) -> bool {
    if s.len() != 36 {
        return false;
    }
    let Ok(uuid) = Uuid::parse_str(s) else {
        return false;
    };
    match version_arg(args).as_deref() {
        None | Some("all") => true,
        Some(v) => v.parse::<usize>().is_ok_and(|v| uuid.get_version_num() == v),
    }
}

fn is_iso8601(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_date(s: &str, args: &[Value]) -> bool {
    match option(args, "format").and_then(Value::as_str) {
        Some(format) => NaiveDate::parse_from_str(s, format).is_ok(),
        None => ["%Y-%m-%d", "%Y/%m/%d"]
            .iter()
            .any(|format| NaiveDate::parse_from_str(s, format).is_ok()),
    }
}

fn is_int(s: &str, args: &[Value]) -> bool {
    if !INT.is_match(s) {
        return false;
    }
    match s.parse::<i64>() {
        Ok(n) => within_bounds(n as f64, args),
        Err(_) => false,
    }
}

fn is_float(s: &str, args: &[Value]) -> bool {
    if matches!(s, "" | "." | "-" | "+") || !FLOAT.is_match(s) {
        return false;
    }
    match s.parse::<f64>() {
        Ok(n) => within_bounds(n, args),
        Err(_) => false,
    }
}

fn is_ip(s: &str, args: &[Value]) -> bool {
    let Ok(addr) = s.parse::<IpAddr>() else {
        return false;
    };
    match version_arg(args).as_deref() {
        None => true,
        Some("4") => addr.is_ipv4(),
        Some("6") => addr.is_ipv6(),
        Some(_) => false,
    }
}

fn is_in(s: &str, args: &[Value]) -> bool {
    let Some(options) = args.first() else {
        return false;
    };
    match options {
        Value::Array(items) => items.iter().any(|item| match item {
            Value::String(v) => v == s,
            other => other.to_string() == s,
        }),
        Value::String(v) => v == s,
        _ => false,
    }
}

fn matches_pattern(s: &str, args: &[Value]) -> bool {
    let Some(pattern) = args.first().and_then(Value::as_str) else {
        return false;
    };
    let pattern = match args.get(1).and_then(Value::as_str) {
        Some(flags) if flags.contains('i') => format!("(?i){}", pattern),
        _ => pattern.to_string(),
    };
    Regex::new(&pattern).is_ok_and(|re| re.is_match(s))
}

static POSTAL_CODES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("BR", r"^\d{5}-?\d{3}$"),
        ("US", r"^\d{5}(-\d{4})?$"),
        ("DE", r"^\d{5}$"),
        ("FR", r"^\d{2}\s?\d{3}$"),
        ("PT", r"^\d{4}-\d{3}$"),
        (
            "CA",
            r"(?i)^[ABCEGHJKLMNPRSTVXY]\d[ABCEGHJ-NPRSTV-Z][\s-]?\d[ABCEGHJ-NPRSTV-Z]\d$",
        ),
        ("GB", r"(?i)^[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}$"),
    ]
    .into_iter()
    .map(|(locale, pattern)| {
        (
            locale,
            Regex::new(pattern).expect("postal code pattern is valid"),
        )
    })
    .collect()
});

fn is_postal_code(s: &str, args: &[Value]) -> bool {
    let locale = args.first().and_then(Value::as_str).unwrap_or("any");
    POSTAL_CODES
        .iter()
        .filter(|(code, _)| locale == "any" || *code == locale)
        .any(|(_, re)| re.is_match(s))
}
