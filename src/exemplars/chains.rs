//! # Prompt chains
//!
//! Single-prompt helpers and two-step chains where the output of the first prompt feeds the second.
//! Intermediate outputs are handed to an observer so a UI can show them before the chain finishes.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;
use anyhow::{bail, Result};
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::prompt::{ChatPromptTemplate, PromptTemplate};
use crate::utils::history::{ChatHistory, HistoryBudget};
use crate::utils::llm::ChatModel;
use crate::utils::postprocess::json::extract_json_as;

lazy_static! {
    static ref CUISINE_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are an expert in traditional cuisines.\n\
        You provide information about a specific dish from a specific country.\n\
        Avoid giving information about fictional places. If the country is fictional\n\
        or non-existent answer: I don't know.\n\
        Answer the question: What is the traditional cuisine of {{country}}?\n\
        Answer in {{number_of_paragraphs}} short paras in {{language}}");
    static ref TRAVEL_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "Welcome to the {{city}} travel guide!\n\
        If you're visiting in {{month}}, here's what you can do:\n\
        1. Must-visit attractions.\n\
        2. Local cuisine you must try.\n\
        3. Useful phrases in {{language}}.\n\
        4. Tips for traveling on a {{budget}} budget.\n\
        Enjoy your trip!");
    static ref INTERVIEW_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are a career coach who, given the {{company}}, {{position}},\n\
        {{strengths}}, and {{weaknesses}}, provides personalized\n\
        interview tips to prepare for success. Give short motivational insight at end of tip");
    static ref MEAL_PLAN_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are a meal planning assistant.\n\
        Create a meal plan for {{num_days}} days based on the following\n\
        dietary restrictions: {{dietary_restrictions}} and\n\
        daily caloric requirement: {{caloric_requirement}}.\n\
        Include healthy snack options daily such as apple with peanut butter etc.\n\
        For each meal, include a link to the recipe.\n\
        Provide a weekly shopping list based on the recipes for that week");
    static ref AGILE_COACH_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system("You are a Agile Coach. Answer any questions related to the agile process")
        .history()
        .human("{{question}}");

    static ref BLOG_OUTLINE_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are a professional blogger.\n\
        Create an outline for a blog post on the following topic: {{topic}}\n\
        The outline should include:\n\
        - Introduction\n\
        - 3 main points with sub-points\n\
        - Conclusion");
    static ref BLOG_INTRODUCTION_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are a professional blogger.\n\
        Write an engaging introduction paragraph based on the following\n\
        outline:{{outline}}\n\
        The introduction should hook the reader and provide a brief\n\
        overview of the topic with {{number_of_paragraphs}} paragraphs.");
    static ref SPEECH_TITLE_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are an experienced speech writer.\n\
        You need to craft an impactful title for a speech\n\
        on the following topic: {{topic}}\n\
        Answer exactly with one title.");
    static ref SPEECH_JSON_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You need to write a powerful {{emotion}} speech of 350 words\n\
        with {{number_of_paragraphs}} paragraphs\n\
        for the following title: {{title}}\n\
        Format the output with 3 keys: 'title', 'speech', 'emotion' and fill\n\
        them with the respective values");
    static ref SPEECH_IN_LANGUAGE_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You need to write a powerful speech of 350 words\n\
        with {{number_of_paragraphs}} paragraphs in {{language}} language\n\
        for the following title: {{title}}");
    static ref EMAIL_SUBJECT_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are an experienced marketing specialist.\n\
        Create a catchy subject line for a marketing\n\
        email promoting the following product: {{product_name}}.\n\
        Highlight these features: {{features}}.\n\
        Respond with only the subject line.");
    static ref EMAIL_BODY_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "Write a marketing email of 300 words for the\n\
        product: {{product_name}}. Use the subject line:\n\
        {{subject_line}}. Tailor the message for the\n\
        following target audience: {{target_audience}}.\n\
        Format the output as a JSON object with three\n\
        keys: 'subject', 'audience', 'email' and fill\n\
        them with respective values.");
    static ref EXTRACT_POINTS_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are an expert content analyst. Your task is to thoroughly analyze the provided transcript and \
        extract ALL key points, insights, examples, and arguments made in the video.\n\n\
        Process:\n\
        1. First, read through the entire transcript carefully\n\
        2. Create a comprehensive list of EVERY distinct point, insight, or example mentioned\n\
        3. Include even seemingly minor points - we want to capture everything\n\
        4. Number each point sequentially\n\
        5. Keep the points in the same order as they appear in the video\n\
        6. For each point, include:\n   \
        - The main idea\n   \
        - Any supporting details or examples given\n   \
        - Any relevant context or connections made\n\n\
        Transcript: {{transcript}}\n\n\
        Please list ALL points made in the video, ensuring nothing is missed.");
    static ref ARTICLE_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "Act as an expert copywriter specializing in content optimization for SEO. Your task is to transform the \
        provided transcript points into a comprehensive, well-structured article.\n\n\
        Here are the extracted key points from the video:\n\
        {{extracted_points}}\n\n\
        Your objectives:\n\n\
        Content Organization:\n\
        1. Create a logical structure that incorporates EVERY point provided above\n\
        2. Ensure no information or examples from the original points are lost\n\
        3. Group related points into coherent sections\n\n\
        Content Development:\n\
        1. Expand on each point while maintaining accuracy\n\
        2. Include all examples and context from the original points\n\
        3. Add appropriate transitions between points\n\
        4. Maintain the depth and nuance of the original content\n\n\
        SEO Optimization:\n\
        1. Identify and incorporate primary and secondary keywords naturally\n\
        2. Create SEO-optimized headings that reflect the content structure\n\
        3. Maintain proper heading hierarchy (H1, H2, H3)\n\
        4. Include a compelling meta title and description\n\n\
        Writing Style:\n\
        1. Make the content engaging and reader-friendly\n\
        2. Use clear, professional language\n\
        3. Maintain proper flow and transitions\n\
        4. Avoid repetition while ensuring completeness\n\n\
        Please provide:\n\
        1. Suggested Meta Title (60-65 characters)\n\
        2. Suggested Meta Description (150-160 characters)\n\
        3. The full article with proper heading structure, incorporating ALL points from the original list\n\n\
        Remember: Every point from the extracted list must be included in the final article - nothing should be left out.");
}

async fn ask(model: &(impl ChatModel + ?Sized), template: &PromptTemplate, values: &[(&str, &str)]) -> Result<String> {
    let prompt = template.format(values)?;
    debug!("prompt:\n{}", prompt);
    model.invoke(&prompt).await
}

pub async fn cuisine_guide(model: &(impl ChatModel + ?Sized), country: &str, number_of_paragraphs: u8, language: &str) -> Result<String> {
    let number_of_paragraphs = number_of_paragraphs.to_string();
    ask(model, &CUISINE_TEMPLATE, &[
        ("country", country),
        ("number_of_paragraphs", &number_of_paragraphs),
        ("language", language),
    ]).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Budget {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Budget::Low => "Low",
            Budget::Medium => "Medium",
            Budget::High => "High",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Budget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Budget::Low),
            "medium" => Ok(Budget::Medium),
            "high" => Ok(Budget::High),
            other => bail!("unknown budget {:?}, expected low, medium or high", other),
        }
    }
}

pub async fn travel_guide(model: &(impl ChatModel + ?Sized), city: &str, month: &str, language: &str, budget: Budget) -> Result<String> {
    let budget = budget.to_string();
    ask(model, &TRAVEL_TEMPLATE, &[
        ("city", city),
        ("month", month),
        ("language", language),
        ("budget", &budget),
    ]).await
}

pub async fn interview_tips(model: &(impl ChatModel + ?Sized), company: &str, position: &str, strengths: &str, weaknesses: &str) -> Result<String> {
    ask(model, &INTERVIEW_TEMPLATE, &[
        ("company", company),
        ("position", position),
        ("strengths", strengths),
        ("weaknesses", weaknesses),
    ]).await
}

pub async fn meal_plan(model: &(impl ChatModel + ?Sized), num_days: u8, dietary_restrictions: &str, caloric_requirement: u32) -> Result<String> {
    let num_days = num_days.to_string();
    let caloric_requirement = caloric_requirement.to_string();
    ask(model, &MEAL_PLAN_TEMPLATE, &[
        ("num_days", &num_days),
        ("dietary_restrictions", dietary_restrictions),
        ("caloric_requirement", &caloric_requirement),
    ]).await
}

/// An agile coach that remembers the conversation.
pub struct AgileCoach<M: ChatModel> {
    pub model: M,
    pub history: ChatHistory,
    /// Unbounded history when `None`.
    pub history_budget: Option<HistoryBudget>,
}

impl<M: ChatModel> AgileCoach<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            history: ChatHistory::new(),
            history_budget: None,
        }
    }

    pub fn with_history_budget(mut self, budget: HistoryBudget) -> Self {
        self.history_budget = Some(budget);
        self
    }

    /// Answer with the previous turns replayed, then remember both the question and the answer.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        if let Some(budget) = &self.history_budget {
            budget.apply(&mut self.history);
        }
        let values = HashMap::from([("question".to_string(), question.to_string())]);
        let messages = AGILE_COACH_TEMPLATE.format_messages(&values, Some(&self.history))?;
        let answer = self.model.chat(&messages).await?;
        self.history.add_user(question);
        self.history.add_assistant(answer.as_str());
        Ok(answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogPost {
    pub outline: String,
    pub introduction: String,
}

/// Outline, then an introduction written from the outline.
pub async fn blog_post(model: &(impl ChatModel + ?Sized), topic: &str, number_of_paragraphs: u8,
                       mut on_outline: impl FnMut(&str)) -> Result<BlogPost> {
    let outline = ask(model, &BLOG_OUTLINE_TEMPLATE, &[("topic", topic)]).await?;
    on_outline(&outline);
    let number_of_paragraphs = number_of_paragraphs.to_string();
    let introduction = ask(model, &BLOG_INTRODUCTION_TEMPLATE, &[
        ("outline", &outline),
        ("number_of_paragraphs", &number_of_paragraphs),
    ]).await?;
    Ok(BlogPost { outline, introduction })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub title: String,
    pub speech: String,
    pub emotion: String,
}

/// Title, then a JSON speech for that title.
pub async fn speech(model: &(impl ChatModel + ?Sized), topic: &str, emotion: &str, number_of_paragraphs: u8,
                    mut on_title: impl FnMut(&str)) -> Result<Speech> {
    let title = ask(model, &SPEECH_TITLE_TEMPLATE, &[("topic", topic)]).await?;
    let title = title.trim();
    on_title(title);
    let number_of_paragraphs = number_of_paragraphs.to_string();
    let reply = ask(model, &SPEECH_JSON_TEMPLATE, &[
        ("title", title),
        ("emotion", emotion),
        ("number_of_paragraphs", &number_of_paragraphs),
    ]).await?;
    extract_json_as(&reply)
}

/// Title from one model, speech in `language` from another.
pub async fn speech_in_language(title_model: &(impl ChatModel + ?Sized), speech_model: &(impl ChatModel + ?Sized),
                                topic: &str, number_of_paragraphs: u8, language: &str,
                                mut on_title: impl FnMut(&str)) -> Result<String> {
    let title = ask(title_model, &SPEECH_TITLE_TEMPLATE, &[("topic", topic)]).await?;
    let title = title.trim();
    on_title(title);
    let number_of_paragraphs = number_of_paragraphs.to_string();
    ask(speech_model, &SPEECH_IN_LANGUAGE_TEMPLATE, &[
        ("title", title),
        ("number_of_paragraphs", &number_of_paragraphs),
        ("language", language),
    ]).await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingEmail {
    pub subject: String,
    pub audience: String,
    pub email: String,
}

/// Subject line, then a JSON email using it.
pub async fn marketing_email(model: &(impl ChatModel + ?Sized), product_name: &str, features: &str, target_audience: &str,
                             mut on_subject: impl FnMut(&str)) -> Result<MarketingEmail> {
    let subject_line = ask(model, &EMAIL_SUBJECT_TEMPLATE, &[
        ("product_name", product_name),
        ("features", features),
    ]).await?;
    let subject_line = subject_line.trim();
    on_subject(subject_line);
    let reply = ask(model, &EMAIL_BODY_TEMPLATE, &[
        ("product_name", product_name),
        ("subject_line", subject_line),
        ("target_audience", target_audience),
    ]).await?;
    extract_json_as(&reply)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub extracted_points: String,
    pub article: String,
}

/// Key points of a transcript, then an SEO article covering all of them.
pub async fn transcript_to_article(model: &(impl ChatModel + ?Sized), transcript: &str,
                                   mut on_points: impl FnMut(&str)) -> Result<Article> {
    if transcript.trim().is_empty() {
        bail!("the transcript is empty");
    }
    let extracted_points = ask(model, &EXTRACT_POINTS_TEMPLATE, &[("transcript", transcript)]).await?;
    on_points(&extracted_points);
    let article = ask(model, &ARTICLE_TEMPLATE, &[("extracted_points", &extracted_points)]).await?;
    Ok(Article { extracted_points, article })
}

#[cfg(test)]
mod test_chains {
    use anyhow::Result;
    use super::{blog_post, cuisine_guide, interview_tips, marketing_email, meal_plan, speech, speech_in_language, transcript_to_article,
                travel_guide, AgileCoach, Budget};
    use crate::utils::history::HistoryBudget;
    use crate::utils::llm::test_models::ScriptedModel;
    use crate::utils::llm::{ChatMessage, Role};
    use crate::utils::token::count_tokens_by_len;

    fn echo(messages: &[ChatMessage]) -> Result<String> {
        Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_single_prompts_fill_every_placeholder() {
        let model = ScriptedModel::new(echo);
        let reply = cuisine_guide(&model, "Peru", 2, "Spanish").await.unwrap();
        assert!(reply.contains("What is the traditional cuisine of Peru?"));
        assert!(reply.ends_with("Answer in 2 short paras in Spanish"));

        let reply = travel_guide(&model, "Lisbon", "May", "Portuguese", "low".parse().unwrap()).await.unwrap();
        assert!(reply.starts_with("Welcome to the Lisbon travel guide!"));
        assert!(reply.contains("Tips for traveling on a Low budget."));
        assert!("cheap".parse::<Budget>().is_err());

        let reply = meal_plan(&model, 7, "vegetarian", 2000).await.unwrap();
        assert!(reply.contains("Create a meal plan for 7 days"));
        assert!(reply.contains("daily caloric requirement: 2000."));

        let reply = interview_tips(&model, "Acme", "Engineer", "focus", "impatience").await.unwrap();
        assert!(reply.starts_with("You are a career coach who, given the Acme, Engineer,\nfocus, and impatience,"));
    }

    #[tokio::test]
    async fn test_agile_coach_replays_history() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| Ok(format!("answer {}", m.len())));
        let mut coach = AgileCoach::new(model);
        assert_eq!("answer 2", coach.ask("What is a sprint?").await.unwrap());
        assert_eq!("answer 4", coach.ask("How long is it?").await.unwrap());
        assert_eq!(4, coach.history.len());

        let second = coach.model.request(1);
        assert_eq!(Role::System, second[0].role);
        assert_eq!("What is a sprint?", second[1].content);
        assert_eq!(Role::Assistant, second[2].role);
        assert_eq!("How long is it?", second[3].content);
    }

    #[tokio::test]
    async fn test_agile_coach_drops_oldest_turns_over_budget() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| Ok(format!("answer {}", m.len())));
        let mut coach = AgileCoach::new(model).with_history_budget(HistoryBudget::new(count_tokens_by_len, 10));
        coach.ask("aaaa").await.unwrap();
        // "answer 2" fits into the budget, "aaaa" does not
        assert_eq!("answer 3", coach.ask("bbbb").await.unwrap());

        let second = coach.model.request(1);
        assert_eq!(3, second.len());
        assert_eq!(Role::Assistant, second[1].role);
        assert_eq!("answer 2", second[1].content);
        assert_eq!(3, coach.history.len());
    }

    #[tokio::test]
    async fn test_blog_post_feeds_outline_forward() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| {
            let prompt = &m[0].content;
            Ok(if prompt.contains("Create an outline") { "OUTLINE".to_string() } else { prompt.clone() })
        });
        let mut seen = Vec::new();
        let post = blog_post(&model, "Rust", 3, |outline| seen.push(outline.to_string())).await.unwrap();
        assert_eq!(vec!["OUTLINE"], seen);
        assert!(post.introduction.contains("outline:OUTLINE"));
        assert!(post.introduction.contains("with 3 paragraphs."));
    }

    #[tokio::test]
    async fn test_speech_parses_json() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| {
            Ok(if m[0].content.contains("craft an impactful title") {
                "  Rise Again \n".to_string()
            } else {
                "Here it is: {\"title\": \"Rise Again\", \"speech\": \"Friends...\", \"emotion\": \"hopeful\"}".to_string()
            })
        });
        let mut title = String::new();
        let speech = speech(&model, "resilience", "hopeful", 3, |t| title = t.to_string()).await.unwrap();
        assert_eq!("Rise Again", title);
        assert_eq!("hopeful", speech.emotion);
        assert!(model.request(1)[0].content.contains("for the following title: Rise Again"));
    }

    #[tokio::test]
    async fn test_speech_in_language_uses_two_models() {
        let title_model = ScriptedModel::new(|_: &[ChatMessage]| Ok("Title".to_string()));
        let speech_model = ScriptedModel::new(echo);
        let text = speech_in_language(&title_model, &speech_model, "hope", 2, "French", |_| {}).await.unwrap();
        assert!(text.contains("with 2 paragraphs in French language"));
        assert_eq!(1, title_model.request_count());
        assert_eq!(1, speech_model.request_count());
    }

    #[tokio::test]
    async fn test_marketing_email_reports_invalid_json() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| {
            Ok(if m[0].content.contains("catchy subject line") { "Fresh Brew".to_string() } else { "not json".to_string() })
        });
        let mut subject = String::new();
        let result = marketing_email(&model, "coffee", "organic", "students", |s| subject = s.to_string()).await;
        assert_eq!("Fresh Brew", subject);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_transcript_to_article() {
        let model = ScriptedModel::new(|m: &[ChatMessage]| {
            Ok(if m[0].content.starts_with("You are an expert content analyst") { "1. point".to_string() } else { m[0].content.clone() })
        });
        let article = transcript_to_article(&model, "we talk about rust", |_| {}).await.unwrap();
        assert_eq!("1. point", article.extracted_points);
        assert!(article.article.contains("Here are the extracted key points from the video:\n1. point\n"));

        assert!(transcript_to_article(&model, "  ", |_| {}).await.is_err());
        assert_eq!(2, model.request_count());
    }
}
