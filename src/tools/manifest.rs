use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::DynamicData;

/// 单个工具的参数键说明
///
/// `any_of` 每组至少出现一个键；`closed` 时拒绝未声明的键。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_args: Vec<String>,
    #[serde(default)]
    pub closed: bool,
}

impl ToolSpec {
    pub fn builder(name: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder::new(name)
    }

    fn declares(&self, key: &str) -> bool {
        self.required_args.iter().any(|k| k == key)
            || self.optional_args.iter().any(|k| k == key)
            || self.any_of.iter().flatten().any(|k| k == key)
    }

    /// 返回 `(缺失, 多余)` 的键
    pub fn check_args(&self, args: &DynamicData) -> (Vec<String>, Vec<String>) {
        let mut missing: Vec<String> = self
            .required_args
            .iter()
            .filter(|key| !args.contains_key(key))
            .cloned()
            .collect();
        for group in &self.any_of {
            if !group.iter().any(|key| args.contains_key(key)) {
                missing.push(group.join("|"));
            }
        }

        let unexpected = if self.closed {
            args.keys()
                .filter(|key| !self.declares(key))
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        (missing, unexpected)
    }
}

pub struct ToolSpecBuilder {
    spec: ToolSpec,
}

impl ToolSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: ToolSpec {
                name: name.into(),
                description: None,
                required_args: Vec::new(),
                any_of: Vec::new(),
                optional_args: Vec::new(),
                closed: false,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn required(mut self, key: impl Into<String>) -> Self {
        self.spec.required_args.push(key.into());
        self
    }

    pub fn any_of<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.any_of.push(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn optional(mut self, key: impl Into<String>) -> Self {
        self.spec.optional_args.push(key.into());
        self
    }

    pub fn closed(mut self) -> Self {
        self.spec.closed = true;
        self
    }

    pub fn build(self) -> ToolSpec {
        self.spec
    }
}

/// 决策校验使用的工具参数目录
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCatalog {
    specs: BTreeMap<String, ToolSpec>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        BUILTIN_CATALOG.clone()
    }

    pub fn register(&mut self, spec: ToolSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn with(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.get(name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

const LOCATOR_KEYS: &[&str] = &["xpath", "selector", "container_selector", "text_content"];
const LOCATOR_MODIFIERS: &[&str] = &["relative_selector", "tag_hint"];

fn locator_tool(name: &str, description: &str) -> ToolSpecBuilder {
    let builder = ToolSpec::builder(name)
        .description(description)
        .any_of(LOCATOR_KEYS.iter().copied());
    LOCATOR_MODIFIERS
        .iter()
        .fold(builder, |builder, key| builder.optional(*key))
}

static BUILTIN_CATALOG: Lazy<ToolCatalog> = Lazy::new(|| {
    let click = |name: &str| {
        locator_tool(name, "Click the located element")
            .optional("pre_actions")
            .closed()
            .build()
    };
    let type_text = |name: &str| {
        locator_tool(name, "Type text into the located element")
            .required("text")
            .optional("submit_key")
            .closed()
            .build()
    };
    let extract = |name: &str| {
        ToolSpec::builder(name)
            .description("Extract content from elements matching a selector")
            .required("selector")
            .optional("attribute")
            .optional("limit")
            .optional("pre_actions")
            .closed()
            .build()
    };

    ToolCatalog::new()
        .with(click("click"))
        .with(click("click_element"))
        .with(type_text("type"))
        .with(type_text("type_text"))
        .with(extract("extract"))
        .with(extract("extract_data"))
        .with(
            ToolSpec::builder("navigate_to")
                .description("Load a URL in the current tab")
                .required("url")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("scroll")
                .description("Scroll the viewport")
                .optional("direction")
                .optional("amount")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("wait")
                .description("Pause for a number of seconds")
                .optional("duration")
                .closed()
                .build(),
        )
        .with(
            locator_tool("get_element_attribute", "Read one attribute of the located element")
                .optional("attribute_name")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("click_nth")
                .description("Click the n-th element matching a selector")
                .required("selector")
                .optional("index")
                .optional("timeout_ms")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("find_link_by_text")
                .description("Find links whose text contains a keyword")
                .required("keyword")
                .optional("limit")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("take_screenshot")
                .description("Capture the current page")
                .optional("task_topic")
                .optional("filename")
                .optional("full_page")
                .optional("output_path")
                .optional("output_dir")
                .closed()
                .build(),
        )
        .with(
            ToolSpec::builder("download_link")
                .description("Download the resource behind a URL")
                .required("url")
                .optional("task_topic")
                .closed()
                .build(),
        )
});
