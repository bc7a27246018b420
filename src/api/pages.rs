use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::Deserialize;

use super::handlers::LedgerData;
use crate::blockchain::Block;

/// Options offered on the ballot form
pub const CANDIDATES: [&str; 3] = ["Candidate A", "Candidate B", "Candidate C"];

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Blockchain-Based Voting System</title>
    <style>
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f4f6f8; margin: 40px; }
        h1, h2 { color: #222; }
        form { background: white; padding: 25px; border-radius: 10px; box-shadow: 0 3px 8px rgba(0,0,0,0.1); max-width: 500px; margin-bottom: 40px; }
        input, select, button { padding: 10px; margin: 8px 0; width: 100%; box-sizing: border-box; font-size: 15px; }
        button { background: #2E8B57; color: white; border: none; cursor: pointer; border-radius: 5px; }
        button:hover { background: #1F5E3C; }
        .block { background: white; padding: 15px; margin-bottom: 15px; border-left: 5px solid #2E8B57; box-shadow: 0 2px 5px rgba(0,0,0,0.1); max-width: 900px; border-radius: 6px; }
        .notice { color: #a33; font-weight: bold; }
        pre { white-space: pre-wrap; word-wrap: break-word; }
        .footer { margin-top: 50px; color: gray; font-size: 14px; }
    </style>
</head>
<body>
    <h1>Blockchain-Based Voting System</h1>
    <p>Votes are recorded on a hash-linked ledger sealed by proof of work, so every record stays transparent and tamper-evident.</p>
"#;

const PAGE_FOOT: &str = r#"    <div class="footer">
        <p>Blockchain Voting System</p>
    </div>
</body>
</html>
"#;

/// Fields posted by the ballot form
#[derive(Debug, Deserialize)]
pub struct BallotForm {
    #[serde(default)]
    pub voter_id: String,

    #[serde(default)]
    pub voter_name: String,

    #[serde(default)]
    pub candidate: String,
}

/// Renders the ballot page with every sealed block
pub fn render_ballot_page(chain: &[Block], notice: Option<&str>) -> serde_json::Result<String> {
    let mut page = String::from(PAGE_HEAD);

    if let Some(notice) = notice {
        page.push_str(&format!("    <p class=\"notice\">{}</p>\n", escape_html(notice)));
    }

    page.push_str(
        r#"    <form action="/add_vote" method="post">
        <input type="text" name="voter_id" placeholder="Voter ID" required>
        <input type="text" name="voter_name" placeholder="Voter Name" required>
        <select name="candidate" required>
            <option value="">-- Select Candidate --</option>
"#,
    );
    for candidate in CANDIDATES {
        let candidate = escape_html(candidate);
        page.push_str(&format!(
            "            <option value=\"{}\">{}</option>\n",
            candidate, candidate
        ));
    }
    page.push_str(
        r#"        </select>
        <button type="submit">Cast Vote</button>
    </form>

    <h2>Blockchain Ledger (Voting Records)</h2>
"#,
    );

    for block in chain {
        let json = serde_json::to_string_pretty(block)?;
        page.push_str(&format!(
            "    <div class=\"block\">\n        <pre>{}</pre>\n    </div>\n",
            escape_html(&json)
        ));
    }

    page.push_str(PAGE_FOOT);
    Ok(page)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());

    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

fn page_response(status: StatusCode, ledger: &LedgerData, notice: Option<&str>) -> HttpResponse {
    match render_ballot_page(&ledger.get_chain(), notice) {
        Ok(page) => HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(page),
        Err(err) => {
            error!("Failed to render ballot page: {}", err);
            HttpResponse::InternalServerError().body("Failed to render ballot page")
        }
    }
}

/// Serves the ballot page
pub async fn index(ledger: LedgerData) -> impl Responder {
    page_response(StatusCode::OK, &ledger, None)
}

/// Handles a ballot form submission and re-renders the page
pub async fn add_vote(ledger: LedgerData, form: web::Form<BallotForm>) -> impl Responder {
    let form = form.into_inner();

    if [&form.voter_id, &form.voter_name, &form.candidate]
        .iter()
        .any(|value| value.trim().is_empty())
    {
        return page_response(
            StatusCode::BAD_REQUEST,
            &ledger,
            Some("Voter ID, voter name and candidate are all required."),
        );
    }

    match ledger
        .cast_vote(form.voter_id, form.voter_name, form.candidate)
        .await
    {
        Ok(_) => page_response(StatusCode::OK, &ledger, None),
        Err(err) => {
            error!("Failed to record vote: {}", err);
            page_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ledger,
                Some("Your vote could not be recorded. Please try again."),
            )
        }
    }
}
