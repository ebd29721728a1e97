use crate::ai::{ContentBlock, PromptMessage, Role};
use crate::models::AnalysisRequest;
use chrono::NaiveDate;

pub const ANALYSIS_SYSTEM: &str = include_str!("../data/prompts/analysis_system.txt");
pub const ANALYSIS_USER: &str = include_str!("../data/prompts/analysis_user.txt");
pub const LAND_AREA: &str = include_str!("../data/prompts/land_area.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Builds the system + user messages for one analysis.
///
/// `today` is passed in rather than read from the clock so the seasonal hint
/// always reflects the moment the request is handled.
pub fn build_prompt(request: &AnalysisRequest, today: NaiveDate) -> Vec<PromptMessage> {
    let current_date = today.format("%B %Y").to_string();
    let system = render(ANALYSIS_SYSTEM, &[("current_date", &current_date)]);

    let land_clause = request
        .land_area
        .as_ref()
        .map(|area| render(LAND_AREA, &[("acres", &area.acres.to_string())]))
        .unwrap_or_default();
    let user_text = render(ANALYSIS_USER, &[("land_clause", land_clause.trim())]);

    vec![
        PromptMessage::text(Role::System, system.trim_end()),
        PromptMessage {
            role: Role::User,
            content: vec![
                ContentBlock::Text(user_text.trim_end().to_string()),
                ContentBlock::ImageUrl(request.image.url()),
            ],
        },
    ]
}
