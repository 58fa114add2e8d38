//! Judge prompt construction
//!
//! The task grades Vietnamese reading-comprehension answers, so the rubric is
//! written in Vietnamese. The judge is asked for a single float in [0, 1].

use crate::types::{JudgePrompt, JudgeRequest};

/// Rendered in place of the reference list when a document has no gold answers
pub const NO_REFERENCE_MARKER: &str = "(không có)";

/// Build the grading prompt for one example
pub fn build_judge_prompt(request: &JudgeRequest) -> JudgePrompt {
    let references = format_references(&request.reference_answers);

    JudgePrompt::new(format!(
        r#"Bạn là trợ lý đánh giá câu trả lời tiếng Việt cho bài toán hỏi đáp đọc hiểu.

Nhiệm vụ của bạn:
- Đọc đoạn văn, câu hỏi, danh sách câu trả lời tham chiếu (ground truth) và câu trả lời của mô hình.
- Chấm điểm ĐỘ ĐÚNG NGHĨA của câu trả lời mô hình so với các câu trả lời tham chiếu.
- Cho điểm từ 0 đến 1:
  - 1.0: nghĩa tương đương hoặc chỉ khác biệt nhỏ, chấp nhận được.
  - 0.5: đúng một phần, còn thiếu hoặc hơi sai.
  - 0.0: sai hoàn toàn, không liên quan, hoặc mâu thuẫn.
- Chỉ xuất ra MỘT SỐ thực duy nhất trong khoảng [0, 1], với tối đa 2 chữ số sau dấu phẩy.
- Không giải thích thêm, không in text nào khác.

Đoạn văn:
{context}

Câu hỏi:
{question}

Các câu trả lời tham chiếu:
{references}

Câu trả lời của mô hình:
{candidate}

Hãy cho điểm (0 đến 1) mức độ đúng nghĩa của câu trả lời mô hình so với các câu trả lời tham chiếu.
Chỉ in duy nhất một số thực trong khoảng [0, 1].
"#,
        context = request.context,
        question = request.question,
        references = references,
        candidate = request.candidate_answer,
    ))
}

/// Bulleted list, one `- ` line per answer
fn format_references(answers: &[String]) -> String {
    if answers.is_empty() {
        return format!("- {}", NO_REFERENCE_MARKER);
    }
    answers
        .iter()
        .map(|a| format!("- {}", a))
        .collect::<Vec<_>>()
        .join("\n")
}
