//! Extraction prompts for the vision model.
//!
//! Centralising prompt construction here serves two purposes:
//!
//! 1. **Single source of truth** — the two-phase extraction instructions
//!    (scan singletons, then enumerate the income table) live in one place.
//!
//! 2. **Schema-driven** — the field list, the singleton examples, and the
//!    JSON example block are generated from the configured
//!    [`FieldSchema`], so a custom schema automatically gets a matching
//!    prompt.
//!
//! Callers can override the whole prompt via
//! [`crate::config::ExtractionConfig::prompt`]; this module is used only when
//! no override is provided.
//!
//! The prompt is Korean because the documents are: the model transcribes
//! Korean table headers more reliably when instructed in the same language.

use crate::schema::FieldSchema;

/// Build the default extraction prompt for `schema`.
pub fn build_extraction_prompt(schema: &FieldSchema) -> String {
    let field_list = schema.fields().join(", ");
    let singleton_list = schema.singleton_fields().join(", ");
    let row_fields: Vec<&str> = schema
        .fields()
        .iter()
        .filter(|f| !schema.singleton_fields().contains(*f))
        .map(String::as_str)
        .collect();
    let row_list = row_fields.join(", ");
    let json_example = json_example(schema);

    format!(
        r#"## 역할
당신은 주어진 문서 전체를 종합적으로 분석하여, 여러 다른 위치와 형식의 표나 텍스트에서 데이터를 정확히 추출하고 구조화된 JSON으로 변환하는 OCR 전문가입니다.

## 작업 순서

### 1단계: 전체 문서에서 단일 값 필드 스캔
먼저 문서 전체를 스캔하여 주로 한 번만 나타나는 다음 값들을 찾습니다. 이 값들은 여러 다른 표나 텍스트 영역에 흩어져 있을 수 있습니다:
{singleton_list}

### 2단계: 사업소득 표의 모든 행 찾기
'사업장별 수입금액' 또는 유사한 표에서 **모든 행(데이터)을 찾아주세요**.
- 각 행은 하나의 사업소득 항목을 나타냅니다
- **빈 행이나 누락된 행이 없도록 주의깊게 확인해주세요**
- 다음 필드들을 각 행에서 추출: {row_list}
- **[매우 중요]** 하나의 셀 안에 텍스트가 여러 줄로 나뉘어 있을 때, 이 텍스트 덩어리 전체는 **하나의 값**입니다. 옆 칸이 비어있다고 해서 텍스트의 일부를 다른 열의 값으로 절대 할당해서는 안됩니다.

### 3단계: 각 행별 JSON 객체 생성
**사업소득 표의 각 행마다** 별도의 JSON 객체를 생성합니다:
1. 해당 행의 사업 관련 데이터로 객체를 채웁니다
2. **1단계에서 찾은 모든 공통 데이터를 동일하게 복사합니다**

### 4단계: 완전한 JSON 배열 생성
- **모든 사업소득 행이 포함되도록 확인**
- 각 객체는 모든 필드를 포함해야 함
- 값이 없는 필드는 "N/A"로 설정

## 중요 지침
- **절대로 데이터를 누락하지 마세요**
- **모든 사업소득 행을 찾아 각각 별도의 JSON 객체로 만드세요**
- 하나의 문서에 여러 사업소득이 있다면, 그 수만큼 JSON 객체가 생성되어야 합니다

### 추출할 항목
{field_list}

### 출력 형식 (여러 행이 있을 경우의 예시)
{json_example}

**반드시 JSON 배열 형태로만 응답하고, 다른 설명은 추가하지 마세요.**"#
    )
}

/// A two-element example array so the model sees the multi-row shape, not
/// just the field names.
fn json_example(schema: &FieldSchema) -> String {
    let object = |value: &str| {
        let body = schema
            .fields()
            .iter()
            .map(|f| format!("    \"{f}\": \"{value}\""))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("  {{\n{body}\n  }}")
    };
    format!("[\n{},\n{}\n]", object("값"), object("값2"))
}
