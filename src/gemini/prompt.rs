//! Prompt text, response schemas and request bodies sent to the provider.

use serde_json::{json, Value};

use crate::model::{AspectRatio, ContentType, GenerationRequest, Persona, PersonaSpec, Post};

/// Prompt plus the JSON schema the answer must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPrompt {
    pub text: String,
    pub schema: Value,
}

pub type CandidatePrompt = StructuredPrompt;
pub type ProfilePrompt = StructuredPrompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJobRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: String,
}

fn platform_list(req: &GenerationRequest) -> String {
    req.platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn candidate_prompt(req: &GenerationRequest, count: u32) -> CandidatePrompt {
    let platforms = platform_list(req);
    let min = format_thousands(req.min_threshold);
    let (format_rule, link_rule) = match req.content_type {
        ContentType::Video => (
            format!("Focus strictly on VIDEO formats published on: {platforms}."),
            "Provide a 'sourceLink' that is a full URL to one specific VIDEO (a YouTube Short or watch page, an Instagram Reel, a TikTok video), never a profile or homepage.",
        ),
        ContentType::Image => (
            format!("Focus strictly on IMAGE formats (photos, carousels, image posts) published on: {platforms}."),
            "Provide a 'sourceLink' that is a full URL to one specific POST, never a profile or homepage.",
        ),
    };

    let text = format!(
        r#"Generate a database of {count} highly viral social media post concepts specifically for the "{topic}" industry targeting the "{region}" region.

IMPORTANT: The content (Title, Hook, Description, Psychological Trigger) MUST be written in {language}.

CRITICAL CRITERIA:
1. Each post must theoretically achieve at least {min} shares within 3 days of publishing.
2. {format_rule}
3. Only consider content from this time window: {period}.
4. The "hook" must be extremely compelling.
5. Provide a psychological trigger explaining WHY it goes viral.
6. The 'shares' value must be a number greater than {min_raw}.
7. 'daysActive' should be exactly 3.
8. Provide a 'sourceHandle' (e.g. @famouscreator) and their estimated 'sourceFollowers' (e.g. "2.5M", "500k").
9. {link_rule} Do not use fake or placeholder URLs. If you cannot find a real, available example, skip the concept and find another one."#,
        topic = req.topic,
        region = req.region,
        language = req.language,
        period = req.period.as_str(),
        min_raw = req.min_threshold,
    );

    CandidatePrompt {
        text,
        schema: candidate_schema(req),
    }
}

/// Array-of-objects schema for a candidate batch; the platform enum is
/// limited to the requested platforms.
pub fn candidate_schema(req: &GenerationRequest) -> Value {
    let language = &req.language;
    let min = req.min_threshold;
    let platforms: Vec<&str> = req.platforms.iter().map(|p| p.as_str()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": format!("A catchy internal title for the post in {language}") },
                "industry": { "type": "STRING" },
                "region": { "type": "STRING", "description": "The target region" },
                "language": { "type": "STRING", "description": "The language of the content" },
                "platform": { "type": "STRING", "enum": platforms },
                "shares": { "type": "NUMBER", "description": format!("Projected share count, must be > {min}") },
                "daysActive": { "type": "NUMBER", "description": "Must be 3" },
                "hook": { "type": "STRING", "description": format!("The first 3 seconds or first line text in {language}") },
                "contentDescription": { "type": "STRING", "description": format!("Brief summary of the visual content in {language}") },
                "psychologicalTrigger": { "type": "STRING", "description": format!("Why users share this (in {language})") },
                "engagementScore": { "type": "NUMBER", "description": "0 to 100 score" },
                "estimatedReach": { "type": "STRING", "description": "e.g., '2.5M', '5M'" },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "sourceHandle": { "type": "STRING", "description": "The handle of the creator" },
                "sourceFollowers": { "type": "STRING", "description": "Estimated follower count (e.g. 1.2M, 500k)" },
                "sourceLink": { "type": "STRING", "description": "A full URL to the specific post" }
            },
            "required": [
                "title", "industry", "region", "platform", "shares", "daysActive", "hook",
                "contentDescription", "psychologicalTrigger", "engagementScore", "estimatedReach",
                "tags", "sourceHandle", "sourceFollowers", "sourceLink"
            ]
        }
    })
}

pub fn strategy_prompt(req: &GenerationRequest) -> String {
    format!(
        "Analyze the current state of viral content in the {topic} industry within the {region} region on {platforms}. \
What specific formats (e.g., Green Screen, POV, Lists) are getting over 100k shares right now? \
Provide a concise 3-bullet point summary strategy in {language}.",
        topic = req.topic,
        region = req.region,
        platforms = platform_list(req),
        language = req.language,
    )
}

pub fn profile_prompt(spec: &PersonaSpec, posts: &[Post]) -> ProfilePrompt {
    let context = posts
        .iter()
        .map(|p| format!("Title: {}, Hook: {}, Style: {}", p.title, p.hook, p.description))
        .collect::<Vec<_>>()
        .join("\n");

    let scripts_line = if spec.generation_type.wants_scripts() {
        "\n- scripts: Three short, ready-to-record video scripts with matching generation prompts."
    } else {
        ""
    };

    let text = format!(
        r#"Create a detailed profile for an AI Influencer designed to create viral content based on these successful post concepts:
{context}

The influencer must fit these constraints:
- Age: {age}
- Sex: {sex}
- Race: {race}
- Character/Personality: {character}
- Primary Language: {language}
- Expected Reach: {reach}
- Preferred Content Duration: {duration}
- Target Platform: {platform}
- Output Format: {output}

Output JSON with:
- name: A catchy name for the influencer.
- bio: A short social media bio (max 150 chars).
- strategy: A brief strategy on how they will dominate the {platform} niche, SPECIFICALLY tailoring the content to be {duration} long (e.g. if 15s, focus on loops/trends; if 3 mins, focus on storytelling).
- visualDescription: A highly detailed, photorealistic prompt to generate an image of this person. Include lighting, camera angle, clothing style, and background.{scripts_line}"#,
        age = spec.age,
        sex = spec.sex,
        race = spec.race,
        character = spec.character,
        language = spec.language,
        reach = spec.expected_reach,
        duration = spec.content_duration,
        platform = spec.platform,
        output = spec.generation_type.as_str(),
    );

    ProfilePrompt {
        text,
        schema: profile_schema(spec),
    }
}

pub fn profile_schema(spec: &PersonaSpec) -> Value {
    let mut schema = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "bio": { "type": "STRING" },
            "strategy": { "type": "STRING" },
            "visualDescription": { "type": "STRING" }
        },
        "required": ["name", "bio", "strategy", "visualDescription"]
    });
    if spec.generation_type.wants_scripts() {
        schema["properties"]["scripts"] = json!({ "type": "STRING" });
    }
    schema
}

pub fn image_prompt(visual_description: &str) -> String {
    format!("A photorealistic photo (medium shot) of an influencer: {visual_description}")
}

pub fn video_prompt(persona: &Persona) -> String {
    let platform = if persona.platform.trim().is_empty() {
        "social media"
    } else {
        persona.platform.as_str()
    };
    format!(
        "A cinematic, high-quality social media video of an influencer named {name}. \
Visuals: {visuals}. \
Action: They are engaging with the camera, appearing charismatic and confident. \
Style: Trending social media aesthetic for {platform}, bright lighting, high resolution, 4k. \
Context: They are about to deliver a viral hook based on this strategy: {strategy}",
        name = persona.name,
        visuals = persona.visual_description,
        strategy = persona.strategy,
    )
}

/// `generateContent` body; JSON mode when a schema is given.
pub fn build_generate_content_body(prompt: &str, schema: Option<&Value>) -> Value {
    let mut body = json!({
        "contents": [ { "parts": [ { "text": prompt } ] } ]
    });
    if let Some(schema) = schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    body
}

pub fn build_image_body(prompt: &str) -> Value {
    json!({
        "contents": [ { "parts": [ { "text": prompt } ] } ],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": "1:1" }
        }
    })
}

pub fn build_video_body(req: &VideoJobRequest) -> Value {
    json!({
        "instances": [ { "prompt": req.prompt } ],
        "parameters": {
            "aspectRatio": req.aspect_ratio.as_str(),
            "resolution": req.resolution,
            "sampleCount": 1
        }
    })
}
