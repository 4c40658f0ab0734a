//! Prompt templates for the rephrase and answer chains.

use ragline_core::{Turn, TurnRole};
use ragline_llm::PromptMessage;

/// Instruction for turning a follow-up into a standalone question.
pub const REPHRASE_INSTRUCTION: &str =
    "Given the conversation so far and a follow-up question, rephrase the \
     follow-up as a standalone question that can be understood by someone \
     who has not seen the conversation. Keep every detail needed to make it \
     self-contained. Reply with the rephrased question only.";

/// Build the rephrase prompt: instruction, history, then the follow-up.
pub fn build_rephrase_messages(history: &[Turn], question: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(REPHRASE_INSTRUCTION));
    for turn in history {
        messages.push(turn_message(turn));
    }
    messages.push(PromptMessage::human(format!(
        "Rephrase the following question as a standalone question:\n{}",
        question
    )));
    messages
}

/// System prompt for answer generation, with the retrieved context embedded.
///
/// With or without context, the model is told to admit when the material
/// has nothing relevant rather than invent an answer.
pub fn answer_system_prompt(context: &str) -> String {
    if context.is_empty() {
        "You are an assistant that answers strictly from provided reference \
         material. No reference material matched this question: say that \
         nothing relevant was found instead of guessing."
            .to_string()
    } else {
        format!(
            "You are an assistant that answers strictly from the reference \
             material below, quoting it where helpful. If the material does \
             not cover the question, say that nothing relevant was found \
             instead of guessing.\n\nReference material:\n{}",
            context
        )
    }
}

/// Build the answer prompt: system (with context), history, standalone
/// question.
pub fn build_answer_messages(
    context: &str,
    history: &[Turn],
    standalone: &str,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(answer_system_prompt(context)));
    for turn in history {
        messages.push(turn_message(turn));
    }
    messages.push(PromptMessage::human(format!(
        "Answer the following question using the reference material:\n{}",
        standalone
    )));
    messages
}

fn turn_message(turn: &Turn) -> PromptMessage {
    match turn.role {
        TurnRole::Human => PromptMessage::human(turn.content.clone()),
        TurnRole::Assistant => PromptMessage::assistant(turn.content.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rephrase_messages_order() {
        let history = vec![Turn::human("你好，我叫小明"), Turn::assistant("你好小明")];
        let messages = build_rephrase_messages(&history, "你觉得我的名字怎么样？");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "你好，我叫小明");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert!(messages[3].content.contains("你觉得我的名字怎么样？"));
    }

    #[test]
    fn test_answer_prompt_embeds_context() {
        let messages = build_answer_messages("球状闪电是一种罕见的大气现象", &[], "什么是球状闪电");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("球状闪电是一种罕见的大气现象"));
        assert!(messages[1].content.ends_with("什么是球状闪电"));
    }

    #[test]
    fn test_empty_context_instructs_no_invention() {
        let prompt = answer_system_prompt("");
        assert!(prompt.contains("nothing relevant was found"));
        assert!(!prompt.contains("Reference material:"));
    }

    #[test]
    fn test_history_roles_map_to_wire_roles() {
        let history = vec![Turn::human("q"), Turn::assistant("a")];
        let messages = build_answer_messages("ctx", &history, "q2");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
    }
}
