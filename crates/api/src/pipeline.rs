use extract::{Extractor, ModelClient};
use ingest::Document;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::{Metrics, TimedOperation};

/// Name under which the generated workbook is offered for download
pub const DOWNLOAD_FILE_NAME: &str = "Estructura_Accionarial.xlsx";

pub struct Workbook {
    pub run_id: Uuid,
    pub bytes: Vec<u8>,
    pub shareholders: usize,
    pub width: u32,
}

/// Extract the shareholder structure from `documents` and lay it out as a workbook.
///
/// Either the complete workbook is returned or nothing is.
pub async fn run<C: ModelClient>(
    extractor: &Extractor<C>,
    metrics: &Metrics,
    documents: &[Document],
) -> Result<Workbook, AppError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, documents = documents.len());

    let result = execute(run_id, extractor, metrics, documents)
        .instrument(span)
        .await;

    metrics.record_run(result.is_ok());
    if let Err(e) = &result {
        error!(%run_id, kind = ?e.kind(), error = %e, "Run failed");
    }

    result
}

async fn execute<C: ModelClient>(
    run_id: Uuid,
    extractor: &Extractor<C>,
    metrics: &Metrics,
    documents: &[Document],
) -> Result<Workbook, AppError> {
    if documents.is_empty() {
        return Err(AppError::input("no documents were provided"));
    }

    let timer = TimedOperation::start();
    let extracted = extractor.extract(documents).await;
    metrics.record_extract(timer.elapsed(), documents.len());
    let result = extracted?;

    let timer = TimedOperation::start();
    let (bytes, plan) = layout::build_workbook(&result)?;
    let shareholders = result.shareholders.len();
    metrics.record_layout(timer.elapsed(), shareholders);

    info!(
        shareholders,
        width = plan.width,
        size = bytes.len(),
        "Workbook generated"
    );

    Ok(Workbook {
        run_id,
        bytes,
        shareholders,
        width: plan.width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use extract::RetryPolicy;
    use extract::testing::CannedClient;

    const REPLY: &str = r#"Aquí tienes los datos:
```json
{
  "accionistas": [
    {"nif": "B12345678", "nombre": "Acme Holding SL", "porcentaje": 60, "pais": "España", "naturaleza": "Persona Jurídica", "pyme": "NO"},
    {"nif": "12345678Z", "nombre": "Juan Pérez", "porcentaje": 40, "pais": "España", "naturaleza": "Persona Física", "pyme": "SI"}
  ],
  "totales": {"publica": 0, "privada": 100}
}
```"#;

    fn extractor(reply: &str) -> Extractor<CannedClient> {
        Extractor::new(CannedClient::new(reply), RetryPolicy::new(3, 1, 2, 1))
    }

    fn deed() -> Document {
        Document::new("escritura.pdf", b"%PDF-1.7".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_run_produces_workbook() {
        let metrics = Metrics::new();
        let workbook = run(&extractor(REPLY), &metrics, &[deed()]).await.unwrap();

        assert_eq!(workbook.shareholders, 2);
        assert_eq!(workbook.width, 14);
        assert_eq!(&workbook.bytes[..2], b"PK");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successful_runs, 1);
        assert_eq!(snapshot.total_shareholders_rendered, 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_error() {
        let metrics = Metrics::new();
        let err = run(&extractor("No he podido leer el documento."), &metrics, &[deed()])
            .await
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(metrics.snapshot().failed_runs, 1);
    }

    #[tokio::test]
    async fn test_no_documents_is_input_error() {
        let metrics = Metrics::new();
        let extractor = extractor(REPLY);
        let err = run(&extractor, &metrics, &[]).await.err().unwrap();

        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(extractor.client().uploads().is_empty());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed_runs, 1);
        assert_eq!(snapshot.avg_extract_time_ms, 0.0);
    }

    #[tokio::test]
    async fn test_failed_upload_is_network_error() {
        let metrics = Metrics::new();
        let extractor = Extractor::new(
            CannedClient::new(REPLY).failing_upload(),
            RetryPolicy::new(3, 1, 2, 1),
        );
        let err = run(&extractor, &metrics, &[deed()]).await.err().unwrap();

        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
