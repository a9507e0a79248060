pub mod jira_item;
pub mod remote_issue;
