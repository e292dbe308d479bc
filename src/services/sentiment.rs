//! Lexicon-based comment scoring.
//!
//! A small valence lexicon in the style of VADER: each known word carries a
//! score in `[-4, 4]`, a preceding negation within three tokens flips it, a
//! preceding booster scales it, and the sum is squashed into `[-1, 1]`.
//! Labels use the usual `±0.05` compound thresholds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Compound score above which a text is positive (below the negation,
/// negative).
pub const LABEL_THRESHOLD: f64 = 0.05;

/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;

/// How far back a negation reaches.
const NEGATION_WINDOW: usize = 3;

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("brilliant", 2.8),
    ("clear", 1.6),
    ("cool", 1.3),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("excellent", 2.7),
    ("fantastic", 2.6),
    ("fun", 2.3),
    ("funny", 1.9),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("helpful", 1.8),
    ("incredible", 2.5),
    ("informative", 1.5),
    ("inspiring", 2.2),
    ("interesting", 1.7),
    ("like", 1.5),
    ("liked", 1.8),
    ("love", 3.2),
    ("loved", 2.9),
    ("masterpiece", 3.0),
    ("nice", 1.8),
    ("perfect", 2.7),
    ("recommend", 1.5),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("useful", 1.9),
    ("wonderful", 2.7),
    ("wow", 2.8),
    ("angry", -2.3),
    ("annoying", -1.9),
    ("awful", -2.0),
    ("bad", -2.5),
    ("boring", -1.3),
    ("broken", -2.1),
    ("clickbait", -2.0),
    ("confusing", -1.3),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("dislike", -1.6),
    ("fake", -2.1),
    ("garbage", -2.1),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("lame", -1.8),
    ("misleading", -1.7),
    ("poor", -2.1),
    ("sad", -2.1),
    ("scam", -2.4),
    ("slow", -0.9),
    ("stupid", -2.4),
    ("terrible", -2.1),
    ("trash", -1.9),
    ("ugly", -2.3),
    ("useless", -1.8),
    ("waste", -1.8),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -2.1),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "cant",
    "dont", "doesnt", "didnt", "isnt", "wasnt", "arent", "aint", "wont", "wouldnt",
    "shouldnt", "couldnt", "without",
];

const BOOSTERS: &[&str] = &[
    "very", "really", "so", "extremely", "super", "totally", "absolutely", "incredibly",
    "truly", "highly",
];

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "all", "any", "can", "had",
    "her", "was", "one", "our", "out", "has", "have", "his", "how", "its", "may", "who",
    "did", "get", "got", "him", "she", "they", "them", "this", "that", "with", "from",
    "what", "when", "where", "which", "while", "will", "would", "there", "their", "then",
    "than", "been", "were", "just", "about", "into", "more", "some", "such", "only", "also",
    "very", "really", "like", "dont", "im", "ive", "youre", "here", "because", "could",
    "should", "over", "even", "much", "most", "other", "these", "those", "after", "before",
    "video", "videos", "watch", "watching", "https", "http", "www", "com",
];

/// Sentiment label derived from a compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_compound(compound: f64) -> Self {
        if compound > LABEL_THRESHOLD {
            Self::Positive
        } else if compound < -LABEL_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Lowercased word tokens with apostrophes removed (`don't` -> `dont`).
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.replace('\'', "").to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn valence(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(entry, _)| *entry == word)
        .map(|(_, score)| *score)
}

/// Compound score in `[-1, 1]`. Empty or unscored text is `0.0`.
pub fn compound_score(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut sum = 0.0;

    for (i, token) in tokens.iter().enumerate() {
        let Some(mut score) = valence(token) else {
            continue;
        };

        if i > 0 && BOOSTERS.contains(&tokens[i - 1].as_str()) {
            score += BOOSTER_INCREMENT * score.signum();
        }
        let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
        if window.iter().any(|t| NEGATIONS.contains(&t.as_str())) {
            score *= NEGATION_SCALAR;
        }
        sum += score;
    }

    if sum == 0.0 {
        return 0.0;
    }
    let normalized = sum / (sum * sum + ALPHA).sqrt();
    normalized.clamp(-1.0, 1.0)
}

/// Label for `text`.
pub fn classify(text: &str) -> SentimentLabel {
    SentimentLabel::from_compound(compound_score(text))
}

/// Returns `true` if the text reads as a question.
pub fn is_question(text: &str) -> bool {
    const OPENERS: &[&str] = &[
        "how", "what", "when", "where", "why", "who", "which", "can", "could", "would", "does",
        "is", "are", "do",
    ];
    let trimmed = text.trim();
    trimmed.ends_with('?')
        || tokenize(trimmed)
            .first()
            .is_some_and(|first| OPENERS.contains(&first.as_str()))
}

/// The `n` most frequent words across `texts`, skipping stop words and
/// tokens shorter than three characters. Ties are ordered alphabetically.
pub fn keyword_frequencies<'a, I>(texts: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for token in tokenize(text) {
            if token.chars().count() < 3
                || token.chars().all(|c| c.is_ascii_digit())
                || STOP_WORDS.contains(&token.as_str())
            {
                continue;
            }
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// What a comment is doing, checked in declaration order; the first match
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentCategory {
    Question,
    Appreciation,
    Criticism,
    Suggestion,
    Feedback,
    Spam,
    Other,
}

impl CommentCategory {
    pub const ALL: [CommentCategory; 7] = [
        Self::Question,
        Self::Appreciation,
        Self::Criticism,
        Self::Suggestion,
        Self::Feedback,
        Self::Spam,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Appreciation => "appreciation",
            Self::Criticism => "criticism",
            Self::Suggestion => "suggestion",
            Self::Feedback => "feedback",
            Self::Spam => "spam",
            Self::Other => "other",
        }
    }
}

const APPRECIATION_WORDS: &[&str] = &[
    "great", "awesome", "love", "amazing", "perfect", "excellent", "fantastic", "brilliant",
];
const CRITICISM_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "dislike", "worst", "garbage", "trash", "boring",
];
const SUGGESTION_WORDS: &[&str] = &[
    "should", "could", "would", "suggest", "recommend", "maybe", "perhaps", "consider",
];
const FEEDBACK_WORDS: &[&str] = &["feedback", "review", "thought", "opinion", "think", "feel"];
const SPAM_MARKERS: &[&str] = &[
    "subscribe", "like", "comment", "check out my channel", "follow me",
];

const NEGATIVE_CONTEXT: &[&str] = &[
    "clickbait", "waste of time", "fake", "scam", "slow", "unwatchable", "ads", "noise",
    "laggy", "again", "great job", "thanks a lot", "as always", "fell off", "boring", "skip",
    "trash", "garbage",
];
const SARCASM_CLUES: &[&str] = &[
    "sure", "totally", "wow", "thanks a lot", "great job", "genius", "lmao", "lol",
    "yeah right", "cant wait", "so helpful", "this aged well", "obviously", "clearly",
    "of course", "naturally",
];
const SARCASM_EMOJI: &[char] = &['🙄', '😒', '🤡', '😂', '🤣', '😑', '😏', '😤'];

/// Points at which a comment counts as sarcastic.
const SARCASM_THRESHOLD: u32 = 3;

/// Single words match whole tokens; phrases match the joined token stream.
fn mentions_any(tokens: &[String], markers: &[&str]) -> bool {
    let joined = format!(" {} ", tokens.join(" "));
    markers.iter().any(|marker| {
        if marker.contains(' ') {
            joined.contains(&format!(" {marker} "))
        } else {
            tokens.iter().any(|t| t == marker)
        }
    })
}

/// Assigns one [`CommentCategory`] to `text`.
pub fn categorize(text: &str) -> CommentCategory {
    if is_question(text) {
        return CommentCategory::Question;
    }
    let tokens = tokenize(text);
    [
        (APPRECIATION_WORDS, CommentCategory::Appreciation),
        (CRITICISM_WORDS, CommentCategory::Criticism),
        (SUGGESTION_WORDS, CommentCategory::Suggestion),
        (FEEDBACK_WORDS, CommentCategory::Feedback),
        (SPAM_MARKERS, CommentCategory::Spam),
    ]
    .into_iter()
    .find(|(markers, _)| mentions_any(&tokens, markers))
    .map_or(CommentCategory::Other, |(_, category)| category)
}

/// Heuristic sarcasm check: negative context words, sarcastic stock
/// phrases, eye-roll emoji, shouted words and scare quotes each add points,
/// and a sentiment that contradicts the context adds more.
pub fn is_sarcastic(text: &str) -> bool {
    let tokens = tokenize(text);
    let compound = compound_score(text);

    let negative_context = mentions_any(&tokens, NEGATIVE_CONTEXT);
    let clue = mentions_any(&tokens, SARCASM_CLUES);
    let emoji = text.chars().any(|c| SARCASM_EMOJI.contains(&c));
    let shouting = text.split_whitespace().any(|word| {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        word.chars().count() >= 2 && word.chars().all(|c| c.is_ascii_uppercase())
    });
    let quoted = text.contains('"') || text.contains('\u{201c}');

    let mut score = 0;
    if negative_context {
        score += 2;
    }
    if clue {
        score += 2;
    }
    if emoji {
        score += 1;
    }
    if shouting {
        score += 1;
    }
    if quoted {
        score += 1;
    }
    if compound > 0.4 && (negative_context || clue) {
        score += 2;
    }
    if compound < 0.4 && (clue || emoji) && negative_context {
        score += 2;
    }
    score >= SARCASM_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_negative_neutral() {
        assert_eq!(classify("This is a great video, I love it"), SentimentLabel::Positive);
        assert_eq!(classify("Worst upload ever, total garbage"), SentimentLabel::Negative);
        assert_eq!(classify("Uploaded on a Tuesday"), SentimentLabel::Neutral);
        assert_eq!(classify(""), SentimentLabel::Neutral);
    }

    #[test]
    fn negation_flips_polarity() {
        assert!(compound_score("good") > 0.0);
        assert!(compound_score("not good") < 0.0);
        assert!(compound_score("don't like this at all") < 0.0);
    }

    #[test]
    fn boosters_increase_magnitude() {
        assert!(compound_score("really good") > compound_score("good"));
        assert!(compound_score("very bad") < compound_score("bad"));
    }

    #[test]
    fn compound_is_bounded() {
        let gushing = "love ".repeat(200);
        let score = compound_score(&gushing);
        assert!(score <= 1.0 && score > 0.9);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(0.051), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(-0.051), SentimentLabel::Negative);
    }

    #[test]
    fn detects_questions() {
        assert!(is_question("Where did you buy that?"));
        assert!(is_question("how do I install it"));
        assert!(!is_question("Nice editing."));
    }

    #[test]
    fn keywords_skip_stop_words_and_short_tokens() {
        let texts = [
            "Rust ownership is great",
            "ownership and borrowing, so good",
            "I am on it: ownership!",
        ];
        let top = keyword_frequencies(texts, 3);
        assert_eq!(top[0], ("ownership".to_string(), 3));
        assert!(top.iter().all(|(word, _)| word.len() >= 3));
        assert!(top.iter().all(|(word, _)| word != "and"));
        assert_eq!(top.len(), 3);
    }

    #[test]
    fn keyword_ties_are_alphabetical() {
        let top = keyword_frequencies(["zebra apple mango"], 10);
        let words: Vec<_> = top.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn categories_follow_priority_order() {
        assert_eq!(categorize("What lens is that?"), CommentCategory::Question);
        assert_eq!(categorize("Amazing edit"), CommentCategory::Appreciation);
        assert_eq!(categorize("boring middle section"), CommentCategory::Criticism);
        assert_eq!(categorize("You should add chapters"), CommentCategory::Suggestion);
        assert_eq!(categorize("Just my opinion here"), CommentCategory::Feedback);
        assert_eq!(categorize("check out my channel pls"), CommentCategory::Spam);
        assert_eq!(categorize("posted at noon"), CommentCategory::Other);
        // Appreciation beats criticism when both appear.
        assert_eq!(categorize("great idea, bad audio"), CommentCategory::Appreciation);
    }

    #[test]
    fn markers_match_whole_words() {
        assert_eq!(categorize("unlikely to return"), CommentCategory::Other);
        assert_eq!(categorize("badge unlocked"), CommentCategory::Other);
    }

    #[test]
    fn sarcasm_needs_several_signals() {
        assert!(is_sarcastic("Wow, great job, another clickbait title 🙄"));
        assert!(is_sarcastic("Oh sure, more ads, exactly what we needed"));
        assert!(!is_sarcastic("Great video, thanks for the tips"));
        assert!(!is_sarcastic("Loved the ending"));
        assert!(!is_sarcastic(""));
    }

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(CommentCategory::Appreciation).unwrap(),
            serde_json::json!("appreciation")
        );
        assert_eq!(CommentCategory::ALL.len(), 7);
    }
}
