//! Korean RAG prompt and fallback answer templates.

use serde::{Deserialize, Serialize};

/// Context characters echoed back by the fallback answer.
pub const FALLBACK_CONTEXT_CHARS: usize = 500;

/// Answer returned when the model produced no candidate text.
pub const NO_ANSWER: &str = "죄송합니다. 응답을 생성할 수 없습니다. 다시 시도해 주세요.";

const QUESTION_MARKER: &str = "**사용자 질문:**";

/// Upstream linguistic analysis of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KoreanAnalysis {
    pub original_query: String,
    pub processed_query: String,
    pub tokenized: Vec<String>,
    pub keywords: Vec<String>,
}

/// Build the prompt asking the model to answer `query` from `context` only.
pub fn build_prompt(query: &str, context: &str, analysis: Option<&KoreanAnalysis>) -> String {
    let mut prompt = String::from(
        "당신은 한국어 문서 기반 질의응답 전문가입니다.
제공된 문서 내용을 바탕으로 사용자의 질문에 정확하고 도움이 되는 답변을 제공하세요.

**답변 지침:**
1. 제공된 문서 내용을 기반으로만 답변하세요
2. 문서에 없는 내용은 추측하지 마세요
3. 한국어로 자연스럽고 정확하게 답변하세요
4. 구체적인 정보와 예시를 포함하세요
5. 만약 문서 내용이 질문과 관련이 없다면 그렇게 알려주세요

",
    );

    if let Some(analysis) = analysis {
        prompt.push_str(&analysis_block(analysis));
    }

    prompt.push_str(&format!(
        "{QUESTION_MARKER} {query}

**관련 문서 내용:**
{context}

**답변:**"
    ));
    prompt
}

fn analysis_block(analysis: &KoreanAnalysis) -> String {
    format!(
        "
**한국어 분석 정보:**
- 처리된 쿼리: {}
- 주요 키워드: {}
- 토큰: {}

",
        analysis.processed_query,
        analysis.keywords.join(", "),
        analysis.tokenized.join(", ")
    )
}

/// Templated answer used when no language model is available.
pub fn fallback_answer(query: &str, context: &str) -> String {
    let excerpt: String = context.chars().take(FALLBACK_CONTEXT_CHARS).collect();
    let ellipsis = if context.chars().count() > FALLBACK_CONTEXT_CHARS {
        "..."
    } else {
        ""
    };

    format!(
        "제공된 문서 내용을 기반으로 답변드리겠습니다.

**질문:** {query}

**관련 문서 내용:**
{excerpt}{ellipsis}

**답변:**
문서 내용을 검토한 결과, 한국어 자연어 처리 시스템과 관련된 정보를 확인할 수 있습니다. 더 정확한 AI 응답을 위해서는 Gemini API 키 설정이 필요합니다.

⚠️ 현재 Gemini API 키가 설정되지 않아 제한된 응답을 제공하고 있습니다. 완전한 AI 응답을 위해 `export GEMINI_API_KEY=your_api_key` 명령으로 API 키를 설정해 주세요."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analysis() -> KoreanAnalysis {
        KoreanAnalysis {
            original_query: "한국어 처리란?".to_string(),
            processed_query: "한국어 처리".to_string(),
            tokenized: vec!["한국어".to_string(), "처리".to_string()],
            keywords: vec!["한국어".to_string(), "자연어".to_string()],
        }
    }

    #[test]
    fn test_prompt_contains_query_and_context() {
        let prompt = build_prompt("질문입니다", "문서입니다", None);

        assert!(prompt.contains("**사용자 질문:** 질문입니다"));
        assert!(prompt.contains("**관련 문서 내용:**\n문서입니다"));
        assert!(prompt.ends_with("**답변:**"));
        assert!(!prompt.contains("한국어 분석 정보"));
    }

    #[test]
    fn test_analysis_block_precedes_question() {
        let prompt = build_prompt("질문", "문서", Some(&analysis()));

        let block = prompt.find("**한국어 분석 정보:**").unwrap();
        let question = prompt.find(QUESTION_MARKER).unwrap();
        assert!(block < question);
        assert!(prompt.contains("- 처리된 쿼리: 한국어 처리"));
        assert!(prompt.contains("- 주요 키워드: 한국어, 자연어"));
        assert!(prompt.contains("- 토큰: 한국어, 처리"));
    }

    #[test]
    fn test_fallback_truncates_by_characters() {
        let context = "가".repeat(FALLBACK_CONTEXT_CHARS + 10);
        let answer = fallback_answer("질문", &context);

        let expected = format!("{}...", "가".repeat(FALLBACK_CONTEXT_CHARS));
        assert!(answer.contains(&expected));
        assert!(!answer.contains(&"가".repeat(FALLBACK_CONTEXT_CHARS + 1)));
    }

    #[test]
    fn test_fallback_short_context_has_no_ellipsis() {
        let answer = fallback_answer("질문", "짧은 문서");

        assert!(answer.contains("**질문:** 질문"));
        assert!(answer.contains("짧은 문서\n\n**답변:**"));
        assert_eq!(answer.matches("...").count(), 0);
    }
}
