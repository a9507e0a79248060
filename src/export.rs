//! Reader for JIRA's XML (RSS) issue export.
//!
//! Only the fixed shape JIRA produces is understood:
//! `<rss><channel><item>…</item>…</channel></rss>`, with the exported custom
//! fields under `<customfields>`.

use std::path::Path;

use roxmltree::{Document, Node};

use crate::model::jira_item::JiraItem;

const PREVIEW_URL_FIELD: &str = "customfield_10027";
const ISSUE_TYPE_FIELD: &str = "customfield_10300";
const FRAMEWORK_FIELD: &str = "customfield_10029";
const EXERCISE_FIELD: &str = "customfield_10024";
const EDIT_URL_FIELD: &str = "customfield_10028";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Export has no <channel> element")]
    MissingChannel,

    #[error("Item {item} is missing <{field}>")]
    MissingField { item: String, field: &'static str },
}

pub fn parse_export_file(path: &Path) -> Result<Vec<JiraItem>, ExportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_export(&contents)
}

/// Parse every `<item>` of the export, in document order.
pub fn parse_export(xml: &str) -> Result<Vec<JiraItem>, ExportError> {
    let doc = Document::parse(xml)?;
    let channel = doc
        .root_element()
        .children()
        .find(Node::is_element)
        .ok_or(ExportError::MissingChannel)?;

    channel
        .children()
        .filter(|n| n.has_tag_name("item"))
        .enumerate()
        .map(|(index, node)| parse_item(node, index))
        .collect()
}

fn parse_item(item: Node, index: usize) -> Result<JiraItem, ExportError> {
    // Until <key> is known, errors name the item by its position.
    let id = child_text(item, "key").ok_or_else(|| ExportError::MissingField {
        item: format!("#{}", index + 1),
        field: "key",
    })?;

    let required = |field: &'static str| {
        child_text(item, field).ok_or_else(|| ExportError::MissingField {
            item: id.clone(),
            field,
        })
    };
    let custom = |field: &'static str| {
        custom_field(item, field).ok_or_else(|| ExportError::MissingField {
            item: id.clone(),
            field,
        })
    };

    Ok(JiraItem {
        title: required("title")?,
        created: required("created")?,
        reporter: required("reporter")?,
        resolution: required("resolution")?,
        description: required("description")?,
        preview_url: custom(PREVIEW_URL_FIELD)?,
        issue_type: custom(ISSUE_TYPE_FIELD)?,
        framework: custom(FRAMEWORK_FIELD)?,
        exercise: custom_field(item, EXERCISE_FIELD),
        edit_url: custom(EDIT_URL_FIELD)?,
        id,
    })
}

/// Text of the first direct child named `name`. An empty element yields `""`.
fn child_text(node: Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .map(element_text)
}

/// Value of `customfields/customfield[@id=id]//customfieldvalue`.
fn custom_field(item: Node, id: &str) -> Option<String> {
    item.children()
        .filter(|n| n.has_tag_name("customfields"))
        .flat_map(|fields| fields.children())
        .filter(|n| n.has_tag_name("customfield") && n.attribute("id") == Some(id))
        .find_map(|field| {
            field
                .descendants()
                .find(|n| n.has_tag_name("customfieldvalue"))
        })
        .map(element_text)
}

fn element_text(node: Node) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}
