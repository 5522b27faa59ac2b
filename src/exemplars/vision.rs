//! Image understanding with a vision capable chat model.

use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};

use crate::utils::llm::{ChatMessage, ChatModel, ImageAttachment};

pub const DESCRIBE_SYSTEM_PROMPT: &str = "You are a helpful assistant that can describe images.";
pub const KYC_SYSTEM_PROMPT: &str = "You are a helpful assistant that can verify identification documents.";

/// Image types the vision demos accept, by extension.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Read an image file into a low detail attachment.
pub fn load_image(path: impl AsRef<Path>) -> Result<ImageAttachment> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        bail!("{} is not a png or jpeg image", path.display());
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mime = if extension == "png" { "image/png" } else { "image/jpeg" };
    Ok(ImageAttachment::from_bytes(&bytes, mime))
}

pub fn describe_image_messages(question: &str, image: ImageAttachment) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(DESCRIBE_SYSTEM_PROMPT),
        ChatMessage::user(question).with_image(image),
    ]
}

pub fn kyc_messages(user_name: &str, user_dob: &str, image: ImageAttachment) -> Vec<ChatMessage> {
    let text = format!("Verify the identification details\nName: {}\nDOB: {}", user_name, user_dob);
    vec![
        ChatMessage::system(KYC_SYSTEM_PROMPT),
        ChatMessage::user(text).with_image(image),
    ]
}

/// Ask a question about an image.
pub async fn describe_image(model: &(impl ChatModel + ?Sized), question: &str, image: ImageAttachment) -> Result<String> {
    if question.trim().is_empty() {
        bail!("the question is empty");
    }
    model.chat(&describe_image_messages(question, image)).await
}

/// Check a name and a date of birth against a photographed identity document.
pub async fn verify_identity(model: &(impl ChatModel + ?Sized), user_name: &str, user_dob: &str, image: ImageAttachment) -> Result<String> {
    model.chat(&kyc_messages(user_name, user_dob, image)).await
}

#[cfg(test)]
mod test_vision {
    use std::fs;
    use anyhow::Result;
    use super::{describe_image, kyc_messages, load_image, DESCRIBE_SYSTEM_PROMPT};
    use crate::utils::llm::test_models::ScriptedModel;
    use crate::utils::llm::{ChatMessage, ImageAttachment, ImageDetail, Role};

    #[test]
    fn test_kyc_messages() {
        let messages = kyc_messages("Ada Lovelace", "1815-12-10", ImageAttachment::jpeg(b"id"));
        assert_eq!(2, messages.len());
        assert_eq!(Role::User, messages[1].role);
        assert_eq!("Verify the identification details\nName: Ada Lovelace\nDOB: 1815-12-10", messages[1].content);
        assert_eq!("data:image/jpeg;base64,aWQ=", messages[1].images[0].data_url);
        assert_eq!(ImageDetail::Low, messages[1].images[0].detail);
    }

    #[tokio::test]
    async fn test_describe_image() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| -> Result<String> { Ok(format!("{} image", m[1].images.len())) });
        assert_eq!("1 image", describe_image(&model, "What is this?", ImageAttachment::jpeg(b"x")).await.unwrap());
        assert_eq!(DESCRIBE_SYSTEM_PROMPT, model.request(0)[0].content);
        assert!(describe_image(&model, " ", ImageAttachment::jpeg(b"x")).await.is_err());
    }

    #[test]
    fn test_load_image() {
        let dir = std::env::temp_dir().join(format!("promptbook-vision-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("photo.JPG"), b"hi").unwrap();
        fs::write(dir.join("notes.txt"), b"hi").unwrap();

        let image = load_image(dir.join("photo.JPG"));
        let text = load_image(dir.join("notes.txt"));
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!("data:image/jpeg;base64,aGk=", image.unwrap().data_url);
        assert!(text.is_err());
    }
}
