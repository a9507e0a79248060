use crate::model::remote_issue::tracker_key;
use crate::util::html::html_to_text;

/// One `<item>` of a JIRA RSS export.
#[derive(Debug, Clone, PartialEq)]
pub struct JiraItem {
    /// Tracker key, e.g. `KA-123`.
    pub id: String,
    /// Issue title as exported, normally already carrying the `[KEY]` prefix.
    pub title: String,
    pub created: String,
    pub reporter: String,
    pub resolution: String,
    /// Raw description, HTML as exported by JIRA.
    pub description: String,
    pub preview_url: String,
    pub issue_type: String,
    pub framework: String,
    pub exercise: Option<String>,
    pub edit_url: String,
}

impl JiraItem {
    /// Title of the created issue. The key is prepended when the exported
    /// title does not carry it, so later runs still recognise the issue.
    pub fn issue_title(&self) -> String {
        if tracker_key(&self.title).as_deref() == Some(self.id.as_str()) {
            self.title.clone()
        } else {
            format!("[{}] {}", self.id, self.title)
        }
    }

    /// Markdown body of the issue created on the target tracker.
    pub fn format_body(&self) -> String {
        let mut body = format!(
            "Created: {}\nReported by: {}\nIssue type: {}\nJIRA status: {}\nLinks: [Preview]({}), [Edit]({})\n",
            self.created,
            self.reporter,
            self.issue_type,
            self.resolution,
            self.preview_url,
            self.edit_url,
        );

        if !self.framework.trim().is_empty() {
            body.push_str(&format!("Framework: {}\n", self.framework));
        }
        if let Some(exercise) = self.exercise.as_deref().filter(|e| !e.trim().is_empty()) {
            body.push_str(&format!("Exercise: {exercise}\n"));
        }

        if let Some(text) = html_to_text(&self.description) {
            body.push('\n');
            body.push_str(&text);
            body.push('\n');
        }

        body
    }
}
