//! Stream frames and payloads shared by the integration tests.

#![allow(dead_code)]

/// A `progress` frame.
pub fn progress_frame(step: &str, percent: u8) -> String {
    format!(
        "event: progress\ndata: {{\"step\":\"{step}\",\"message\":\"Working on {step}\",\"detail\":null,\"progress\":{percent}}}\n\n"
    )
}

/// A `progress` frame carrying a detail line.
pub fn progress_frame_with_detail(step: &str, percent: u8, detail: &str) -> String {
    format!(
        "event: progress\ndata: {{\"step\":\"{step}\",\"message\":\"\",\"detail\":\"{detail}\",\"progress\":{percent}}}\n\n"
    )
}

/// A `report` frame for a small but complete report.
pub fn report_frame(id: &str) -> String {
    format!("event: report\ndata: {}\n\n", sample_report_json(id))
}

/// A `report` frame whose sections have nulls and unexpected types.
pub fn loosely_typed_report_frame(id: &str) -> String {
    let report = serde_json::json!({
        "id": id,
        "question": "Does rapamycin extend lifespan in mice?",
        "generated_at": 1736000000,
        "executive_summary": null,
        "key_findings": [
            {"statement": "Lifespan extension", "source_indices": [1, "2"], "confidence": null},
            "not a finding"
        ],
        "protocols": [
            {"name": "Rapamycin", "species": "Mouse", "dosage": 14, "source_index": "1"}
        ],
        "limitations": ["Few studies"],
        "sources": [
            {"index": 1, "title": "Rapamycin fed late in life extends lifespan", "journal": "Nature", "year": null, "url": "https://pubmed.ncbi.nlm.nih.gov/19587680", "citation_count": "3000"}
        ],
        "total_papers_searched": "180",
        "papers_used": null
    });
    format!("event: report\ndata: {report}\n\n")
}

pub fn error_frame(message: &str) -> String {
    format!("event: error\ndata: {{\"message\":\"{message}\"}}\n\n")
}

pub fn complete_frame() -> String {
    "event: complete\ndata: {}\n\n".to_string()
}

/// JSON of a report as the server returns it.
pub fn sample_report_json(id: &str) -> String {
    serde_json::json!({
        "id": id,
        "question": "Does rapamycin extend lifespan in mice?",
        "generated_at": "2025-01-04T10:22:31.123456",
        "executive_summary": "Rapamycin consistently extends median lifespan in mice.",
        "key_findings": [
            {"statement": "Lifespan extension in both sexes", "source_indices": [1, 2], "confidence": "high"}
        ],
        "detailed_analysis": "Across ITP cohorts [1] and follow-up work [2] ...",
        "protocols": [
            {"name": "Rapamycin", "species": "Mouse", "dosage": "14 ppm", "frequency": "Daily", "duration": null, "result": "Median lifespan +14%", "source_index": 1}
        ],
        "limitations": "Few studies in non-rodent species.",
        "sources": [
            {"index": 1, "title": "Rapamycin fed late in life extends lifespan", "journal": "Nature", "year": 2009, "pmid": "19587680", "abstract": "...", "url": "https://pubmed.ncbi.nlm.nih.gov/19587680", "citation_count": 3000},
            {"index": 2, "title": "Rapamycin slows aging in mice", "journal": "Aging Cell", "year": 2012, "pmid": "22587563", "abstract": "...", "url": "https://pubmed.ncbi.nlm.nih.gov/22587563", "citation_count": 700}
        ],
        "total_papers_searched": 180,
        "papers_used": 2
    })
    .to_string()
}
