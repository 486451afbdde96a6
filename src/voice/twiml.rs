//! Minimal TwiML document builder.

use std::fmt;

/// Voice used for `<Say>` verbs.
pub const DEFAULT_VOICE: &str = "alice";

/// Media type of TwiML replies.
pub const CONTENT_TYPE: &str = "application/xml";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Say {
    voice: String,
    text: String,
}

/// A `<Response>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Twiml {
    says: Vec<Say>,
}

impl Twiml {
    /// Empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` with the default voice.
    pub fn say(self, text: impl Into<String>) -> Self {
        self.say_with_voice(DEFAULT_VOICE, text)
    }

    /// Speak `text` with `voice`.
    pub fn say_with_voice(mut self, voice: impl Into<String>, text: impl Into<String>) -> Self {
        self.says.push(Say {
            voice: voice.into(),
            text: text.into(),
        });
        self
    }
}

/// Escape the five XML special characters.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Twiml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        if self.says.is_empty() {
            return f.write_str("<Response/>");
        }
        f.write_str("<Response>")?;
        for say in &self.says {
            write!(f, r#"<Say voice="{}">{}</Say>"#, escape(&say.voice), escape(&say.text))?;
        }
        f.write_str("</Response>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_verbs_in_order() {
        let doc = Twiml::new().say("Hold on").say_with_voice("man", "Bye").to_string();
        assert_eq!(
            doc,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Say voice="alice">Hold on</Say><Say voice="man">Bye</Say></Response>"#
        );
    }

    #[test]
    fn text_is_escaped() {
        let doc = Twiml::new().say("Tom & Jerry <3").to_string();
        assert!(doc.contains("Tom &amp; Jerry &lt;3"));
    }
}
