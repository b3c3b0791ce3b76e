//! HTML message bodies for Telegram's `parse_mode=HTML`.

/// Escapes the characters Telegram's HTML parser treats as markup.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn feedback_message(feedback: &str, questions: &[String]) -> String {
    let mut message = format!(
        "<b>🤖 AI Scrum Master Feedback</b>\n\n{}\n",
        escape_html(feedback)
    );

    if !questions.is_empty() {
        message.push_str("\n<b>Questions:</b>\n");
        for (i, question) in questions.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, escape_html(question)));
        }
    }

    message
}

pub fn analysis_message(text: &str) -> String {
    format!("<b>🤖 AI Analysis</b>\n\n{}", escape_html(text))
}
