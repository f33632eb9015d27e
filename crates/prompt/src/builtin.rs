//! Prompt definitions shipped with the binary.

use crate::types::PromptDefinition;

pub const RECOMMEND_PROMPT_ID: &str = "movie.recommend";
pub const SIMILAR_PROMPT_ID: &str = "movie.similar";

const SYSTEM: &str = "You are a knowledgeable movie assistant. Only recommend movies that \
appear in the provided context, and never invent ratings or budgets.";

const RECOMMEND_TEMPLATE: &str = "Based on the following user request, recommend movies and explain why they match:
{{query}}

For each recommended movie, provide:
1. Title and year
2. Genres
3. Average rating and number of votes
4. A brief explanation of why it matches the request
5. Any notable aspects (high budget, part of a collection, etc.)

Focus on movies that best match the user's specific preferences and requirements.

Movies:
{{context}}";

const SIMILAR_TEMPLATE: &str = "Find movies similar to '{{title}}' with these characteristics:
- Genres: {{genres}}
- Runtime: {{runtime}} minutes
- Rating: {{rating}}

Consider both the plot elements and these characteristics.
Prioritize movies with similar genres and themes.

Movies:
{{context}}";

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, template) = match id {
        RECOMMEND_PROMPT_ID => ("Movie recommendations", RECOMMEND_TEMPLATE),
        SIMILAR_PROMPT_ID => ("Similar movies", SIMILAR_TEMPLATE),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        system: Some(SYSTEM.to_string()),
        template: template.to_string(),
    })
}
