use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ArticleId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    JavaScript,
    React,
    Node,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::JavaScript, Topic::React, Topic::Node];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::JavaScript => "JavaScript",
            Topic::React => "React",
            Topic::Node => "Node",
        }
    }

    /// Case-insensitive lookup, used for user-typed topics.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: ArticleId,
    pub title: String,
    pub text: String,
    pub topic: Topic,
}

/// Editable fields of an article; the server assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub text: String,
    pub topic: Topic,
}

impl ArticleDraft {
    pub fn new(title: impl Into<String>, text: impl Into<String>, topic: Topic) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            topic,
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty() && !self.text.trim().is_empty()
    }
}

impl From<&Article> for ArticleDraft {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            text: article.text.clone(),
            topic: article.topic,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_serializes_with_server_spelling() {
        let article = Article {
            article_id: ArticleId(7),
            title: "Hooks".into(),
            text: "useEffect all the things".into(),
            topic: Topic::JavaScript,
        };
        let value = serde_json::to_value(&article).expect("serialize");
        assert_eq!(value["article_id"], 7);
        assert_eq!(value["topic"], "JavaScript");
    }

    #[test]
    fn topic_parse_ignores_case_and_whitespace() {
        assert_eq!(Topic::parse(" react "), Some(Topic::React));
        assert_eq!(Topic::parse("NODE"), Some(Topic::Node));
        assert_eq!(Topic::parse("rust"), None);
    }

    #[test]
    fn drafts_and_credentials_reject_blank_fields() {
        assert!(ArticleDraft::new("t", "x", Topic::Node).is_submittable());
        assert!(!ArticleDraft::new("  ", "x", Topic::Node).is_submittable());
        assert!(Credentials::new("bob", "x").is_well_formed());
        assert!(!Credentials::new("bob", " ").is_well_formed());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("bob", "hunter2"));
        assert!(rendered.contains("bob"));
        assert!(!rendered.contains("hunter2"));
    }
}
