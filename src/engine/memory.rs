use crate::model::{ActionFeedback, DecisionAction};

/// 将每个已结束的动作折叠进 `memory_context`
///
/// 每条记录占一行，超出字符上限时先丢弃最旧的内容。
#[derive(Clone, Debug)]
pub struct MemoryComposer {
    limit: usize,
}

impl Default for MemoryComposer {
    fn default() -> Self {
        Self::new(4000)
    }
}

impl MemoryComposer {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn entry(cycle: u32, action: &DecisionAction, feedback: &ActionFeedback) -> String {
        let mut line = format!("#{} {} -> {}", cycle, action.tool_name, feedback.status);
        if !feedback.error_code.is_none() {
            line.push_str(&format!(" [{}]", feedback.error_code));
        }
        if !feedback.message.is_empty() {
            line.push_str(&format!(": {}", feedback.message));
        }
        if !action.reasoning.is_empty() {
            line.push_str(&format!(" | reasoning: {}", action.reasoning));
        }
        line
    }

    pub fn fold(
        &self,
        previous: &str,
        cycle: u32,
        action: &DecisionAction,
        feedback: &ActionFeedback,
    ) -> String {
        let entry = Self::entry(cycle, action, feedback);
        let combined = if previous.is_empty() {
            entry
        } else {
            format!("{}\n{}", previous, entry)
        };
        self.truncate(combined)
    }

    fn truncate(&self, text: String) -> String {
        let excess = text.chars().count().saturating_sub(self.limit);
        if excess == 0 {
            return text;
        }
        match text.char_indices().nth(excess) {
            Some((offset, _)) => text[offset..].to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_keeps_reasoning_code_and_message() {
        let action = DecisionAction::new("click", 0.8).with_reasoning("login button is visible");
        let feedback = ActionFeedback::failed("E_NOT_CLICKABLE", "covered by modal");
        let entry = MemoryComposer::entry(2, &action, &feedback);
        assert_eq!(
            entry,
            "#2 click -> FAILED [E_NOT_CLICKABLE]: covered by modal | reasoning: login button is visible"
        );
    }

    #[test]
    fn fold_drops_oldest_text_on_char_boundaries() {
        let composer = MemoryComposer::new(25);
        let action = DecisionAction::new("type", 0.5);
        let memory = composer.fold("ééééé", 1, &action, &ActionFeedback::success("ok"));
        assert_eq!(memory, "éé\n#1 type -> SUCCESS: ok");
    }
}
