//! Hypermedia entities exposed by the swap daemon
//!
//! Swap resources are Siren documents: `properties` describe the swap,
//! `actions` list what may be done next. Field classes such as
//! `["bitcoin", "address"]` tell the client which wallet value to fill in.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default)]
    pub properties: serde_json::Value,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Set on embedded links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rel: Vec<String>,
}

impl Entity {
    /// Href of the `self` link, or of the embedded link itself
    pub fn self_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.iter().any(|r| r == "self"))
            .map(|l| l.href.as_str())
            .or(self.href.as_deref())
    }

    pub fn actions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Action> + 'a {
        self.actions.iter().filter(move |a| a.name == name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions_named(name).next().is_some()
    }

    /// Deserialize the properties into a typed view
    pub fn properties_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.properties.clone())
    }

    /// Swap status property, if present
    pub fn status(&self) -> Option<&str> {
        self.properties.get("status").and_then(|s| s.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: Vec<String>,
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Field {
    pub fn has_classes(&self, classes: &[&str]) -> bool {
        classes.iter().all(|c| self.class.iter().any(|own| own == c))
    }
}
