use crate::dto::view_dto::format_score;

/// Values printed on a certificate.
#[derive(Debug, Clone)]
pub struct CertificateContent<'a> {
    pub issuer: &'a str,
    pub candidate_name: &'a str,
    pub assessment_title: &'a str,
    pub score: Option<f64>,
    pub certificate_id: &'a str,
    pub issued_on: &'a str,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_certificate_html(content: &CertificateContent<'_>) -> String {
    let name = if content.candidate_name.trim().is_empty() {
        "Candidate"
    } else {
        content.candidate_name
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Certificate {certificate_id}</title>
<style>
  @page {{ size: A4 landscape; margin: 0; }}
  body {{ font-family: Georgia, serif; margin: 0; color: #1f2937; }}
  .frame {{ border: 12px solid #1e3a8a; margin: 24px; padding: 48px; text-align: center; }}
  .issuer {{ letter-spacing: 4px; text-transform: uppercase; color: #1e3a8a; }}
  .name {{ font-size: 40px; margin: 24px 0; }}
  .score {{ font-size: 22px; }}
  .meta {{ margin-top: 48px; font-size: 12px; color: #6b7280; }}
</style>
</head>
<body>
<div class="frame">
  <div class="issuer">{issuer}</div>
  <h1>Certificate of Achievement</h1>
  <p>This certifies that</p>
  <div class="name">{name}</div>
  <p>has successfully completed the assessment</p>
  <h2>{title}</h2>
  <div class="score">Overall score: {score} / 10</div>
  <div class="meta">Certificate ID: {certificate_id} &middot; Issued on {issued_on}</div>
</div>
</body>
</html>
"#,
        issuer = escape_html(content.issuer),
        name = escape_html(name),
        title = escape_html(content.assessment_title),
        score = format_score(content.score),
        certificate_id = escape_html(content.certificate_id),
        issued_on = escape_html(content.issued_on),
    )
}
