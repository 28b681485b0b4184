use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_PHONE_DIGITS: usize = 10;
pub const MAX_SEARCH_QUERY_LEN: usize = 100;
pub const MAX_FILENAME_LEN: usize = 255;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9\s+()-]+$").unwrap());
static SLUG_DROP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static FILENAME_DROP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());
static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// At least eight characters including one ASCII letter. A password without
/// a digit passes with a warning.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(anyhow!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(anyhow!("Password must contain at least one letter"));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        warn!("Password should contain at least one number");
    }

    Ok(())
}

/// Digits, spaces and `+ - ( )` only, with at least ten digits
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone) && phone.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

pub fn sanitize_input(input: &str) -> String {
    input.trim().to_string()
}

pub fn sanitize_search_query(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .take(MAX_SEARCH_QUERY_LEN)
        .collect()
}

pub fn sanitize_filename(filename: &str) -> String {
    let replaced = FILENAME_DROP.replace_all(filename, "_");
    DOT_RUNS
        .replace_all(&replaced, ".")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

/// URL slug of a company name: lowercase, punctuation dropped, whitespace
/// runs turned into single hyphens
pub fn generate_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let kept = SLUG_DROP.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&kept, "-");
    HYPHENS
        .replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}

/// Payload of the admin "onboard customer" form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A request that passed validation, with trimmed fields and its slug
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedOnboarding {
    pub company_name: String,
    pub slug: String,
    pub email: String,
    pub plan: String,
    pub phone: Option<String>,
}

impl OnboardRequest {
    pub fn validate(&self) -> Result<ValidatedOnboarding> {
        let company_name = sanitize_input(&self.company_name);
        let email = sanitize_input(&self.email);
        let plan = sanitize_input(&self.plan);

        if company_name.is_empty() || email.is_empty() || self.password.is_empty() || plan.is_empty()
        {
            return Err(anyhow!("Missing required fields"));
        }

        validate_password(&self.password)?;

        if !is_valid_email(&email) {
            return Err(anyhow!("Invalid email format"));
        }

        let phone = self
            .phone
            .as_deref()
            .map(sanitize_input)
            .filter(|p| !p.is_empty());
        if let Some(phone) = phone.as_deref().filter(|p| !is_valid_phone(p)) {
            return Err(anyhow!("Invalid phone number: {}", phone));
        }

        let slug = generate_slug(&company_name);
        if slug.is_empty() {
            return Err(anyhow!(
                "Company name '{}' has no characters usable in a slug",
                company_name
            ));
        }

        Ok(ValidatedOnboarding {
            company_name,
            slug,
            email,
            plan,
            phone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OnboardRequest {
        OnboardRequest {
            company_name: "  Acme Realty, LLC ".to_string(),
            email: "owner@acme.com".to_string(),
            password: "hunter22".to_string(),
            plan: "pro".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("lettersonly").is_ok());
        assert!(validate_password("abc12345").is_ok());
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("555123456x7"));
    }

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_input("  hi "), "hi");
        assert_eq!(sanitize_search_query(" <b>\"bob's\" "), "bbobs");
        assert_eq!(sanitize_search_query(&"x".repeat(150)).len(), 100);
        assert_eq!(sanitize_filename("../etc/pass wd"), "._etc_pass_wd");
        assert_eq!(
            escape_html(r#"<a href="/x">Tom & 'Jo'</a>"#),
            "&lt;a href=&quot;&#x2F;x&quot;&gt;Tom &amp; &#x27;Jo&#x27;&lt;&#x2F;a&gt;"
        );
    }

    #[test]
    fn test_slug() {
        assert_eq!(generate_slug("  Acme Realty, LLC "), "acme-realty-llc");
        assert_eq!(generate_slug("--Big   -- Deal--"), "big-deal");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_validate_request() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.company_name, "Acme Realty, LLC");
        assert_eq!(valid.slug, "acme-realty-llc");

        let missing = OnboardRequest {
            plan: "   ".to_string(),
            ..request()
        };
        assert!(missing.validate().is_err());

        let bad_email = OnboardRequest {
            email: "owner.acme.com".to_string(),
            ..request()
        };
        assert!(bad_email.validate().is_err());

        let bad_phone = OnboardRequest {
            phone: Some("12".to_string()),
            ..request()
        };
        assert!(bad_phone.validate().is_err());

        let blank_phone = OnboardRequest {
            phone: Some("  ".to_string()),
            ..request()
        };
        assert_eq!(blank_phone.validate().unwrap().phone, None);
    }

    #[test]
    fn test_request_from_json() {
        let parsed: OnboardRequest = serde_json::from_str(
            r#"{"companyName": "Acme", "email": "a@b.co", "password": "pass1234", "plan": "basic"}"#,
        )
        .unwrap();
        assert_eq!(parsed.validate().unwrap().slug, "acme");
    }
}
