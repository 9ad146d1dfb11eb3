use serde::{Deserialize, Serialize};

pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "Signature",
    "Signed",
    "Sign Here",
    "Employee Signature",
    "Learner Signature",
];

/// One run of extracted page text. `transform` is the text matrix
/// `[scale_x, skew_y, skew_x, scale_y, origin_x, origin_y]` in PDF space.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub transform: [f64; 6],
    #[serde(default)]
    pub width: f64,
}

impl TextFragment {
    pub fn origin_x(&self) -> f64 {
        self.transform[4]
    }

    pub fn origin_y(&self) -> f64 {
        self.transform[5]
    }
}

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// First fragment, in extraction order, whose text contains any keyword
/// (case-insensitive).
pub fn find_signature_anchor<'a, S: AsRef<str>>(
    fragments: &'a [TextFragment],
    keywords: &[S],
) -> Option<&'a TextFragment> {
    let needles = keywords
        .iter()
        .map(|keyword| keyword.as_ref().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<_>>();
    if needles.is_empty() {
        return None;
    }
    fragments.iter().find(|fragment| {
        let text = fragment.text.to_lowercase();
        needles.iter().any(|needle| text.contains(needle.as_str()))
    })
}
