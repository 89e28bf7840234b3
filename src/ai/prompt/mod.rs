//! Prompt Builder
//!
//! Standardized prompt construction so every phase prompt has the same shape:
//! role, objectives, context, input material, guidelines, things to avoid.

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key-value pairs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bulleted rules the output must follow
    Guidelines(Vec<String>),
    /// Phrases or habits the output must not contain
    Avoid(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.to_string()).collect(),
        ));
        self
    }

    /// Add a context item; consecutive items share one context block
    pub fn context_item(mut self, key: &str, value: impl Into<String>) -> Self {
        let item = (key.to_string(), value.into());
        match self.sections.last_mut() {
            Some(PromptSection::Context(items)) => items.push(item),
            _ => self.sections.push(PromptSection::Context(vec![item])),
        }
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.into(),
        });
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.into(),
        });
        self
    }

    pub fn guidelines(mut self, rules: &[&str]) -> Self {
        self.sections.push(PromptSection::Guidelines(
            rules.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    pub fn avoid(mut self, habits: &[&str]) -> Self {
        self.sections.push(PromptSection::Avoid(
            habits.iter().map(|h| h.to_string()).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!("You are an expert {} {}.\n", expertise, task));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Guidelines(rules) => {
                    prompt.push_str("<GUIDELINES>\n");
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push_str("</GUIDELINES>\n\n");
                }
                PromptSection::Avoid(habits) => {
                    prompt.push_str("<AVOID>\n");
                    for habit in habits {
                        prompt.push_str(&format!("WRONG: {}\n", habit));
                    }
                    prompt.push_str("</AVOID>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("content strategist", "who plans blog articles")
            .objectives(&["Split the topic", "Write queries"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("content strategist"));
        assert!(prompt.contains("1. Split the topic"));
        assert!(prompt.contains("2. Write queries"));
    }

    #[test]
    fn test_context_items_share_block_in_order() {
        let prompt = PromptBuilder::new()
            .context_item("Title", "Async Rust")
            .context_item("Length", "1200 words")
            .build();

        assert_eq!(prompt.matches("# Context").count(), 1);
        let title = prompt.find("**Title**: Async Rust").unwrap();
        let length = prompt.find("**Length**: 1200 words").unwrap();
        assert!(title < length);
    }

    #[test]
    fn test_guidelines_and_avoid() {
        let prompt = PromptBuilder::new()
            .guidelines(&["Start with an H2 heading"])
            .avoid(&["In conclusion"])
            .build();

        assert!(prompt.contains("- Start with an H2 heading"));
        assert!(prompt.contains("WRONG: In conclusion"));
    }

    #[test]
    fn test_sections_with_header() {
        let prompt = PromptBuilder::new()
            .section("Research Notes", "finding one")
            .build();
        assert!(prompt.starts_with("# Research Notes\n\nfinding one"));
    }
}
