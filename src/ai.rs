use std::path::Path;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::Engine;

use crate::config::Config;

const DESCRIBE_PROMPT: &str = "Describe this scene in an engaging, experiential way. \
Focus on creating atmosphere and emotional connection. Use sensory details and \
descriptive language that helps viewers feel present in the space. Avoid clinical \
observations - instead, describe how the space feels and what makes it special.
Consider:
- The mood and atmosphere
- How the space might make someone feel
- Interesting details that catch the eye
- The flow and relationship between elements
- Any unique or distinctive features
Write as if you're guiding someone through a personal tour.";

const DESCRIBE_INSTRUCTION: &str =
    "Please provide an engaging, atmospheric description of this scene:";

const DESCRIBE_MAX_TOKENS: u32 = 300;

/// Turns one still frame into a short scene description.
#[async_trait]
pub(crate) trait VisionModel: Send + Sync {
    async fn describe(&self, image: &Path) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextRequest {
    pub(crate) system: String,
    pub(crate) user: String,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
}

/// Rewrites prompt context into free text.
#[async_trait]
pub(crate) trait TextModel: Send + Sync {
    async fn synthesize(&self, request: &TextRequest) -> anyhow::Result<String>;
}

pub(crate) struct OpenAi {
    client: Client<OpenAIConfig>,
    vision_model: String,
    text_model: String,
    timeout: Duration,
}

impl OpenAi {
    pub(crate) fn new(config: &Config) -> Self {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(&config.api_key));
        Self {
            client,
            vision_model: config.vision_model.clone(),
            text_model: config.text_model.clone(),
            timeout: config.request_timeout,
        }
    }

    async fn complete(&self, request: CreateChatCompletionRequest) -> anyhow::Result<String> {
        let response =
            tokio::time::timeout(self.timeout, self.client.chat().create(request)).await??;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(anyhow::anyhow!("No content in response from OpenAI"))
    }
}

pub(crate) async fn jpeg_data_url(image: &Path) -> anyhow::Result<String> {
    use base64::prelude::BASE64_STANDARD;

    let jpeg_data = tokio::fs::read(image).await?;
    Ok("data:image/jpeg;base64,".to_owned() + &BASE64_STANDARD.encode(jpeg_data))
}

#[async_trait]
impl VisionModel for OpenAi {
    async fn describe(&self, image: &Path) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.vision_model)
            .max_tokens(DESCRIBE_MAX_TOKENS)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(DESCRIBE_PROMPT)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(ChatCompletionRequestUserMessageContent::Array(vec![
                            ChatCompletionRequestUserMessageContentPart::Text(
                                ChatCompletionRequestMessageContentPartTextArgs::default()
                                    .text(DESCRIBE_INSTRUCTION)
                                    .build()?,
                            ),
                            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                                ChatCompletionRequestMessageContentPartImageArgs::default()
                                    .image_url(
                                        ImageUrlArgs::default()
                                            .url(jpeg_data_url(image).await?)
                                            .build()?,
                                    )
                                    .build()?,
                            ),
                        ]))
                        .build()?,
                ),
            ])
            .build()?;

        self.complete(request).await
    }
}

#[async_trait]
impl TextModel for OpenAi {
    async fn synthesize(&self, request: &TextRequest) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.text_model)
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(request.system.as_str())
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(request.user.as_str())
                        .build()?,
                ),
            ])
            .build()?;

        self.complete(request).await
    }
}
