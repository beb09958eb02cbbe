/// Grammar adjustment — article agreement, determiner absorption and
/// possessive suffixes around a replaced name.
///
/// Everything here is a pure function of its inputs so that preview
/// rendering and patch building always agree on the span being rewritten.

use crate::config::{DeterminerPolicy, GrammarPolicy, PossessiveStyle};

/// A concrete rewrite: replace `start..end` (byte offsets into the field),
/// which must currently read `original`, with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub original: String,
}

impl Adjustment {
    /// A rewrite of exactly the matched span, with no grammar applied.
    pub fn raw(position: usize, matched_text: &str, replacement: &str) -> Self {
        Self {
            text: replacement.to_string(),
            start: position,
            end: position + matched_text.len(),
            original: matched_text.to_string(),
        }
    }

    /// True if the span reaches beyond the matched text.
    pub fn is_widened(&self, position: usize, matched_text: &str) -> bool {
        self.start < position || self.end > position + matched_text.len()
    }
}

/// The word directly before a match, separated from it only by spaces or tabs.
struct LeadingWord<'a> {
    word: &'a str,
    gap: &'a str,
    /// Offset of `word` within the context-before window.
    offset: usize,
}

fn leading_word(context_before: &str, window_at_field_start: bool) -> Option<LeadingWord<'_>> {
    let trimmed = context_before.trim_end_matches([' ', '\t']);
    let gap = &context_before[trimmed.len()..];
    if gap.is_empty() {
        return None;
    }

    let offset = trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let word = &trimmed[offset..];
    if word.is_empty() {
        return None;
    }

    if offset == 0 {
        // The window may have cut a longer word in half.
        if !window_at_field_start {
            return None;
        }
    } else if let Some(prev) = trimmed[..offset].chars().next_back() {
        if prev.is_alphanumeric() || prev == '\'' || prev == '’' || prev == '-' {
            return None;
        }
    }

    Some(LeadingWord { word, gap, offset })
}

/// Choose "a" or "an" for the word starting `phrase`.
pub fn indefinite_article(phrase: &str, policy: &GrammarPolicy) -> &'static str {
    let lower = phrase.trim_start().to_lowercase();
    if policy
        .vowel_sound_prefixes
        .iter()
        .any(|p| lower.starts_with(p.as_str()))
    {
        return "an";
    }
    if policy
        .consonant_sound_prefixes
        .iter()
        .any(|p| lower.starts_with(p.as_str()))
    {
        return "a";
    }
    match lower.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

/// Re-case `word` to follow the capitalisation of `like`.
fn match_case(word: &str, like: &str) -> String {
    let mut like_chars = like.chars();
    let first_upper = like_chars.next().is_some_and(|c| c.is_uppercase());
    let all_upper =
        first_upper && like.chars().count() > 1 && like.chars().all(|c| c.is_uppercase());
    if all_upper {
        return word.to_uppercase();
    }
    if first_upper {
        let mut chars = word.chars();
        return match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    word.to_lowercase()
}

/// Split a leading "the" off `phrase`, returning the remainder (with its
/// leading whitespace).
fn strip_leading_the(phrase: &str) -> Option<&str> {
    let head = phrase.get(..3)?;
    if !head.eq_ignore_ascii_case("the") {
        return None;
    }
    let rest = &phrase[3..];
    rest.starts_with([' ', '\t']).then_some(rest)
}

/// True if a lowercase word follows the match, meaning a preceding "the"
/// belongs to that noun ("the Holt family") rather than to the name.
fn common_noun_follows(context_after: &str) -> bool {
    let rest = context_after.trim_start_matches([' ', '\t']);
    rest.len() < context_after.len() && rest.chars().next().is_some_and(|c| c.is_lowercase())
}

fn ends_with_s(text: &str) -> bool {
    matches!(text.chars().next_back(), Some('s' | 'S'))
}

/// A possessive suffix directly after the match.
struct Possessive {
    apostrophe: char,
    has_s: bool,
    len: usize,
}

fn possessive_after(context_after: &str, matched_text: &str) -> Option<Possessive> {
    let mut chars = context_after.chars();
    let apostrophe = chars.next().filter(|c| *c == '\'' || *c == '’')?;
    let alen = apostrophe.len_utf8();
    match chars.next() {
        Some('s' | 'S') => {
            let boundary = chars.next().map_or(true, |c| !c.is_alphanumeric());
            boundary.then_some(Possessive { apostrophe, has_s: true, len: alen + 1 })
        }
        // A bare apostrophe is only a possessive after an s-final name and
        // before a space; otherwise it is most likely a closing quote.
        Some(' ' | '\t') if ends_with_s(matched_text) => {
            Some(Possessive { apostrophe, has_s: false, len: alen })
        }
        _ => None,
    }
}

/// Compute the grammatically adjusted rewrite for a match.
///
/// `context_before` and `context_after` are the windows captured at scan
/// time; `position` is the match's byte offset in the field. The span only
/// ever widens over one adjacent word and horizontal whitespace before the
/// match, or a possessive suffix after it, so it never crosses a line or
/// sentence boundary.
pub fn adjust(
    context_before: &str,
    context_after: &str,
    position: usize,
    matched_text: &str,
    replacement: &str,
    policy: &GrammarPolicy,
) -> Adjustment {
    let mut adj = Adjustment::raw(position, matched_text, replacement);
    if replacement.is_empty() {
        return adj;
    }

    // A window longer than the offset cannot have come from this field.
    let Some(window_start) = position.checked_sub(context_before.len()) else {
        return adj;
    };
    let at_field_start = window_start == 0;
    if let Some(lead) = leading_word(context_before, at_field_start) {
        let lead_start = window_start + lead.offset;
        let absorbed = &context_before[lead.offset..];
        let own_the = strip_leading_the(replacement);
        match lead.word.to_lowercase().as_str() {
            "a" | "an" if own_the.is_some() && policy.determiner != DeterminerPolicy::Keep => {
                // "a the Order" reads as "the Order"; the replacement's
                // determiner wins and takes the article's case.
                let rest = own_the.unwrap_or_default();
                adj.text = format!("{}{}", match_case("the", lead.word), rest);
                adj.start = lead_start;
                adj.original = format!("{absorbed}{matched_text}");
            }
            current @ ("a" | "an") if policy.article_agreement => {
                let wanted = indefinite_article(replacement, policy);
                if wanted != current {
                    adj.text =
                        format!("{}{}{}", match_case(wanted, lead.word), lead.gap, replacement);
                    adj.start = lead_start;
                    adj.original = format!("{absorbed}{matched_text}");
                }
            }
            "the" => {
                let absorb = match policy.determiner {
                    DeterminerPolicy::Keep => false,
                    DeterminerPolicy::AbsorbDuplicate => own_the.is_some(),
                    DeterminerPolicy::AbsorbBeforeProperNoun => {
                        own_the.is_some()
                            || (replacement.chars().next().is_some_and(|c| c.is_uppercase())
                                && !common_noun_follows(context_after))
                    }
                };
                if absorb {
                    adj.text = match own_the {
                        // Keep the sentence's own determiner and its case.
                        Some(rest) => format!("{}{}", lead.word, rest),
                        None => replacement.to_string(),
                    };
                    adj.start = lead_start;
                    adj.original = format!("{absorbed}{matched_text}");
                }
            }
            _ => {}
        }
    }

    if let Some(poss) = possessive_after(context_after, matched_text) {
        let want_s = match policy.possessive {
            PossessiveStyle::Standard => true,
            PossessiveStyle::BareApostropheAfterS => !ends_with_s(&adj.text),
        };
        if want_s != poss.has_s {
            adj.end += poss.len;
            adj.original.push_str(&context_after[..poss.len]);
            adj.text.push(poss.apostrophe);
            if want_s {
                adj.text.push('s');
            }
        }
    }

    adj
}
