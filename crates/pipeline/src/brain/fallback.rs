//! Deterministic placeholder text for when no tier produced anything.
//!
//! Responses are keyed off the markers the stage prompts end with, so that
//! downstream parsers still see a well-shaped document.

/// Marker the blog prompt ends with
pub const BLOG_MARKER: &str = "BLOG_POST";
/// Marker the social prompt ends with
pub const SOCIAL_MARKER: &str = "SOCIAL_SNIPPETS";

const PLACEHOLDER_BLOG: &str = "# Sample Blog Post

This is a locally generated placeholder blog post. Replace with a local LLM for richer content.

## Introduction

We explore the topic, highlight benefits, and provide actionable insights.

## Key Points

- Insight 1
- Insight 2
- Insight 3

## Conclusion

A concise wrap-up with a call-to-action.";

const PLACEHOLDER_SOCIAL: &str = "TWEETS:
- Tweet 1
- Tweet 2
- Tweet 3

LINKEDIN:
- LinkedIn Post 1
- LinkedIn Post 2

INSTAGRAM:
- Caption 1
- Caption 2
- Caption 3
";

const PLACEHOLDER_GENERIC: &str = "Generic response. Provide a local LLM for better results.";

pub fn canned_response(prompt: &str) -> &'static str {
    if prompt.contains(BLOG_MARKER) {
        PLACEHOLDER_BLOG
    } else if prompt.contains(SOCIAL_MARKER) {
        PLACEHOLDER_SOCIAL
    } else {
        PLACEHOLDER_GENERIC
    }
}
