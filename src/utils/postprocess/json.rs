use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{from_str, Value};

/// Cut the outermost `{...}` object out of a model reply and parse it.
///
/// Models like to wrap JSON in prose or in a fenced code block, so everything before the first `{` and
/// after the last `}` is ignored.
///
/// # Example
/// ```
/// use promptbook::utils::postprocess::json::extract_json;
/// let reply = "Sure! ```json\n{\"title\": \"Hello\"}\n```";
/// let value = extract_json(reply).unwrap();
/// assert_eq!(value["title"], "Hello");
///
/// assert!(extract_json("no object here").is_err());
/// ```
pub fn extract_json(reply: &str) -> Result<Value> {
    Ok(from_str(json_span(reply)?)?)
}

/// Like [extract_json], but deserializes straight into `T`.
pub fn extract_json_as<T: DeserializeOwned>(reply: &str) -> Result<T> {
    Ok(from_str(json_span(reply)?)?)
}

fn json_span(reply: &str) -> Result<&str> {
    match (reply.find('{'), reply.rfind('}')) {
        (Some(left), Some(right)) if left < right => Ok(&reply[left..=right]),
        _ => Err(InvalidJSON { invalid_string: reply.to_string() }.into())
    }
}

/// Error when a reply holds no JSON object.
#[derive(Debug, Clone)]
pub struct InvalidJSON {
    pub invalid_string: String,
}

impl fmt::Display for InvalidJSON {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "No JSON object in reply:\n{}", self.invalid_string)
    }
}

impl Error for InvalidJSON {}

#[cfg(test)]
mod test_json {
    use serde::Deserialize;
    use super::{extract_json, extract_json_as, InvalidJSON};

    #[derive(Deserialize)]
    struct Email {
        subject: String,
        body: String,
    }

    #[test]
    fn test_extract_json() {
        let value = extract_json("{\"a\":\"alice\"}").unwrap();
        assert_eq!(value["a"], "alice");

        let value = extract_json("Here is the result you ask for: {\"a\": {\"b\": 1}} hope it helps").unwrap();
        assert_eq!(value["a"]["b"], 1);

        let error = extract_json("Here is the result you ask for: {\"a\":\"alice\"").unwrap_err();
        assert!(error.downcast_ref::<InvalidJSON>().is_some());

        assert!(extract_json("} backwards {").is_err());
        assert!(extract_json("{{}}").is_err());
    }

    #[test]
    fn test_extract_typed() {
        let reply = "```json\n{\"subject\": \"Spring sale\", \"body\": \"Dear customer\"}\n```";
        let email: Email = extract_json_as(reply).unwrap();
        assert_eq!("Spring sale", email.subject);
        assert_eq!("Dear customer", email.body);
        assert!(extract_json_as::<Email>("{\"subject\": \"only\"}").is_err());
    }
}
