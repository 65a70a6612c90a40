//! Email address guessing from a person name and a district web domain.
//! Guessed addresses always carry `email_guessed = true` downstream; nothing
//! here is verified.

/// Pull the bare domain out of a website URL: scheme and `www.` stripped,
/// path dropped.
pub fn extract_domain(website: &str) -> Option<String> {
    let rest = website
        .strip_prefix("https://")
        .or_else(|| website.strip_prefix("http://"))
        .unwrap_or(website);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let domain = rest.split('/').next().unwrap_or_default().trim();
    if domain.is_empty() || !domain.contains('.') {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Candidate addresses for a person at a domain, most common pattern first.
/// Returns an empty list when the name has fewer than two parts.
pub fn guess_emails(name: &str, domain: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let parts: Vec<&str> = lower
        .split_whitespace()
        .filter(|p| !p.trim_end_matches('.').eq_ignore_ascii_case("dr"))
        .collect();
    if parts.len() < 2 || domain.is_empty() {
        return Vec::new();
    }

    let first = parts[0].replace('.', "");
    let last = parts[parts.len() - 1].replace('.', "");
    let Some(initial) = first.chars().next() else {
        return Vec::new();
    };

    vec![
        format!("{first}.{last}@{domain}"),
        format!("{initial}{last}@{domain}"),
        format!("{first}{last}@{domain}"),
        format!("{first}_{last}@{domain}"),
        format!("{last}.{first}@{domain}"),
        format!("superintendent@{domain}"),
    ]
}

/// Most likely address, if one can be guessed at all.
pub fn best_guess(name: &str, domain: &str) -> Option<String> {
    guess_emails(name, domain).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_survive_scheme_www_and_paths() {
        assert_eq!(
            extract_domain("https://www.seattleschools.org/about"),
            Some("seattleschools.org".into())
        );
        assert_eq!(extract_domain("http://fwps.org"), Some("fwps.org".into()));
        assert_eq!(extract_domain("nsd.org/district"), Some("nsd.org".into()));
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("https://localhost"), None);
    }

    #[test]
    fn patterns_lead_with_first_dot_last() {
        let guesses = guess_emails("Israel Vela", "kent.k12.wa.us");
        assert_eq!(guesses[0], "israel.vela@kent.k12.wa.us");
        assert!(guesses.contains(&"ivela@kent.k12.wa.us".to_string()));
        assert!(guesses.contains(&"superintendent@kent.k12.wa.us".to_string()));
    }

    #[test]
    fn honorifics_and_middle_initials_are_ignored() {
        assert_eq!(
            best_guess("Dr. Kurt M. Buttleman", "seattleschools.org"),
            Some("kurt.buttleman@seattleschools.org".into())
        );
    }

    #[test]
    fn single_word_names_guess_nothing() {
        assert!(guess_emails("Cher", "district.org").is_empty());
        assert!(guess_emails("Jane Roe", "").is_empty());
    }
}
