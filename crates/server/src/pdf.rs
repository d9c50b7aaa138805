//! PDF generation for contracts and invoices.
//!
//! Documents are rendered from Tera HTML templates and converted with
//! `wkhtmltopdf` when it is on PATH; without it the HTML itself is returned
//! for browser printing, which keeps development machines working.

use std::collections::HashMap;
use std::process::Stdio;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use freeflow_core::{Contract, Invoice};

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Formats a money value to two decimal places. Accepts both numbers and
/// the decimal strings our domain types serialize to.
/// Usage: `amount | money`
fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = match value {
        tera::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        tera::Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(tera::Value::String(format!("{num:.2}")))
}

pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

#[derive(Clone, Debug)]
pub struct PdfGenerator {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl PdfGenerator {
    pub fn new(template_dir: &str) -> Result<Self, PdfError> {
        let mut tera = Tera::new(&format!("{template_dir}/**/*"))
            .map_err(|e| PdfError::Template(e.to_string()))?;
        register_template_filters(&mut tera);

        Ok(Self { tera, wkhtmltopdf_path: find_wkhtmltopdf() })
    }

    /// Generator backed by the templates compiled into the binary. Used when
    /// the filesystem templates are unavailable, and by tests.
    pub fn with_embedded_templates() -> Self {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);

        tera.add_raw_template(
            "contracts/agreement.html.tera",
            include_str!("../../../templates/contracts/agreement.html.tera"),
        )
        .expect("embedded contract template must parse");
        tera.add_raw_template(
            "invoices/invoice.html.tera",
            include_str!("../../../templates/invoices/invoice.html.tera"),
        )
        .expect("embedded invoice template must parse");

        Self { tera, wkhtmltopdf_path: find_wkhtmltopdf() }
    }

    pub async fn render_contract(&self, contract: &Contract) -> Result<PdfResult, PdfError> {
        let mut context = Context::new();
        context.insert("contract", contract);
        context.insert("variables", &contract.variables);
        self.render("contracts/agreement.html.tera", &context).await
    }

    pub async fn render_invoice(&self, invoice: &Invoice) -> Result<PdfResult, PdfError> {
        let mut context = Context::new();
        context.insert("invoice", invoice);
        context.insert("details", &invoice.details);
        self.render("invoices/invoice.html.tera", &context).await
    }

    async fn render(&self, template: &str, context: &Context) -> Result<PdfResult, PdfError> {
        let html =
            self.tera.render(template, context).map_err(|e| PdfError::Template(e.to_string()))?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match self.convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => Ok(PdfResult::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    Ok(PdfResult::Html(html))
                }
            }
        } else {
            Ok(PdfResult::Html(html))
        }
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf_path: &str,
    ) -> Result<Vec<u8>, PdfError> {
        let temp_dir = std::env::temp_dir();
        let stamp = uuid::Uuid::new_v4();
        let html_path = temp_dir.join(format!("freeflow_{stamp}.html"));
        let pdf_path = temp_dir.join(format!("freeflow_{stamp}.pdf"));

        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(wkhtmltopdf_path)
            .arg("--page-size")
            .arg("A4")
            .arg("--margin-top")
            .arg("10mm")
            .arg("--margin-bottom")
            .arg("10mm")
            .arg("--margin-left")
            .arg("10mm")
            .arg("--margin-right")
            .arg("10mm")
            .arg("--encoding")
            .arg("utf-8")
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "wkhtmltopdf failed");
            return Err(PdfError::Conversion(stderr.to_string()));
        }

        let pdf_bytes = tokio::fs::read(&pdf_path).await?;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        info!(size = pdf_bytes.len(), "PDF generated");
        Ok(pdf_bytes)
    }
}

fn find_wkhtmltopdf() -> Option<String> {
    which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string())
}

/// Download file name: the first 8 characters of the entity id.
pub fn attachment_filename(entity_id: &str) -> String {
    let stem: String = entity_id.chars().take(8).collect();
    format!("{stem}.pdf")
}

pub enum PdfResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl PdfResult {
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            PdfResult::Pdf(bytes) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/pdf")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                )
                .body(Body::from(bytes))
                .unwrap(),
            PdfResult::Html(html) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .body(Body::from(html))
                .unwrap(),
        }
    }
}
