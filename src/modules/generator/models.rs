use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::upstream::ChatResponse;

/// Smallest word count the form offers.
pub const MIN_WORD_COUNT: u32 = 10;
/// Largest word count the form offers.
pub const MAX_WORD_COUNT: u32 = 300;

/// Text returned in place of a post when the provider produced nothing.
pub const EMPTY_COMPLETION_FALLBACK: &str = "Too many requests, please try again later!";

/// Writing style requested for the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Informative,
    Casual,
    Funny,
    Persuasive,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Informative, Tone::Casual, Tone::Funny, Tone::Persuasive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Informative => "informative",
            Tone::Casual => "casual",
            Tone::Funny => "funny",
            Tone::Persuasive => "persuasive",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, so both `Informative` and `informative` parse.
impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown tone '{}'", wanted))
    }
}

/// Word count as browsers send it: a number, or a string from a range input.
///
/// Any other JSON shape lands in `Other` so it fails validation instead of
/// body parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl CountValue {
    fn to_count(&self) -> Option<u32> {
        match self {
            CountValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            }),
            CountValue::Text(s) => s.trim().parse().ok(),
            CountValue::Other(_) => None,
        }
    }
}

/// Request body of `POST /generate` before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationPayload {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub count: Option<CountValue>,
}

impl GenerationPayload {
    /// Check every field, collecting one detail entry per problem.
    pub fn validate(self) -> Result<GenerationRequest, Vec<Value>> {
        let mut details = Vec::new();

        let topic = match self.topic.as_deref().map(str::trim) {
            Some(topic) if !topic.is_empty() => Some(topic.to_string()),
            _ => {
                details.push(json!({"field": "topic", "error": "required"}));
                None
            }
        };

        let tone = match self.tone.as_deref() {
            None => {
                details.push(json!({"field": "tone", "error": "required"}));
                None
            }
            Some(raw) => match raw.parse::<Tone>() {
                Ok(tone) => Some(tone),
                Err(error) => {
                    details.push(json!({
                        "field": "tone",
                        "error": error,
                        "allowed": Tone::ALL.iter().map(Tone::as_str).collect::<Vec<_>>(),
                    }));
                    None
                }
            },
        };

        let count = match self.count.as_ref().map(CountValue::to_count) {
            None => {
                details.push(json!({"field": "count", "error": "required"}));
                None
            }
            Some(Some(count)) if (MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&count) => Some(count),
            Some(_) => {
                details.push(json!({
                    "field": "count",
                    "error": format!(
                        "must be a whole number between {} and {}",
                        MIN_WORD_COUNT, MAX_WORD_COUNT
                    ),
                }));
                None
            }
        };

        match (topic, tone, count) {
            (Some(topic), Some(tone), Some(count)) if details.is_empty() => {
                Ok(GenerationRequest { topic, tone, count })
            }
            _ => Err(details),
        }
    }
}

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub tone: Tone,
    pub count: u32,
}

/// Why a successful response carries substitute text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    EmptyCompletion,
}

/// Response body of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(rename = "blogPost")]
    pub blog_post: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl GenerationResult {
    /// First choice's text verbatim, or the fallback tagged `empty_completion`.
    pub fn from_response(response: &ChatResponse) -> Self {
        match response.first_content() {
            Some(text) => Self {
                blog_post: text.to_string(),
                notice: None,
            },
            None => Self {
                blog_post: EMPTY_COMPLETION_FALLBACK.to_string(),
                notice: Some(Notice::EmptyCompletion),
            },
        }
    }
}
