//! Transaction extraction and categorization through the model.

use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::{Category, Direction, PipelineError, Transaction};
use tally_ingest::DocumentKind;
use tracing::debug;

use crate::client::ModelClient;
use crate::schema::{transaction_schema, GenerateRequest, GenerateResponse};

const PDF_INSTRUCTION: &str = "\
You are a world-class financial analysis engine. Process the provided raw bank statement text and:

1. EXTRACT all transactions from the text
2. STANDARDIZE the format
3. CATEGORIZE each transaction
4. RETURN properly structured JSON

Lines starting with [TRANSACTION] probably hold a transaction row; lines starting with [AMOUNT] probably hold an amount. These tags are hints only.

EXTRACTION & FORMATTING RULES:
- Parse any date format and convert to YYYY-MM-DD
- Extract merchant names, amounts, and transaction types
- Identify Money In vs Money Out transactions
- Report every amount as a positive number; the type carries the direction
- Clean up descriptions and references

CATEGORIZATION GUIDELINES:
- 'Groceries': ALDI, Rewe, EDEKA, Lidl, Albert Heijn, AEZ
- 'Shopping': Amazon, Temu, Ernsting's Family, Woolworth, H&M, Zalando
- 'Dining/Fast Food': Burger King, McDonald's, Subway, restaurants
- 'Transport/Travel': DB Vertrieb GmbH, MVV, Airbnb, transport
- 'Telecom/Utilities': E-Plus Service GmbH, mobile/internet providers
- 'Childcare/Education': Schools, daycare, education fees
- 'Transfer/Payment': Person-to-person transfers, payments
- 'Salary/Income': Salary, income, benefits
- 'Refunds': Returned purchases, chargebacks
- 'Online Subscription': Streaming, software and other recurring online services
- 'Fees/Other': Bank fees, charges, misc
- 'Personal Finance': Savings, investments, financial services
- 'Leisure/Hobby': Entertainment, hobbies, recreation

Return a JSON array of transaction objects with the exact schema provided.
";

const CSV_INSTRUCTION: &str = "\
You are a world-class financial analysis engine. Process the provided CSV bank statement data and:

1. EXTRACT all transactions from the CSV data
2. STANDARDIZE the format
3. CATEGORIZE each transaction
4. RETURN properly structured JSON

CSV PROCESSING RULES:
- The first row may contain column headers (Date, Description, Amount, etc.)
- If headers are present, use them to identify fields
- If no headers, process based on field positions and delimiters
- Parse any date format and convert to YYYY-MM-DD
- Extract merchant names, amounts, and transaction types
- Identify Money In vs Money Out transactions (positive/negative amounts or debit/credit indicators)
- Report every amount as a positive number; the type carries the direction
- Clean up descriptions and references

CATEGORIZATION GUIDELINES:
- 'Groceries': ALDI, Rewe, EDEKA, Lidl, Albert Heijn, AEZ, supermarket names
- 'Shopping': Amazon, Temu, Ernsting's Family, Woolworth, H&M, Zalando, retail stores
- 'Dining/Fast Food': Burger King, McDonald's, Subway, restaurants, food delivery
- 'Transport/Travel': DB Vertrieb GmbH, MVV, Airbnb, transport, fuel, parking
- 'Telecom/Utilities': E-Plus Service GmbH, mobile/internet providers, electricity, gas
- 'Childcare/Education': Schools, daycare, education fees, books
- 'Transfer/Payment': Person-to-person transfers, payments, wire transfers
- 'Salary/Income': Salary, income, benefits
- 'Refunds': Refunds, returns, chargebacks
- 'Online Subscription': Streaming, software and other recurring online services
- 'Fees/Other': Bank fees, charges, ATM fees, miscellaneous
- 'Personal Finance': Savings, investments, financial services, insurance
- 'Leisure/Hobby': Entertainment, hobbies, recreation

IMPORTANT CSV CONSIDERATIONS:
- Handle different CSV formats (comma, semicolon, tab delimited)
- Account for quoted fields that may contain delimiters
- Process empty fields gracefully
- Detect currency symbols and amounts
- Handle different date formats (DD/MM/YYYY, MM/DD/YYYY, YYYY-MM-DD)

Return a JSON array of transaction objects with the exact schema provided.
";

/// Build the categorization request. PDF text is expected to be annotated already.
pub fn categorization_request(text: &str, kind: DocumentKind) -> GenerateRequest {
    let (system, user) = match kind {
        DocumentKind::Pdf => (PDF_INSTRUCTION, format!("Process this bank statement:\n\n{text}")),
        DocumentKind::Csv => (CSV_INSTRUCTION, format!("Process this CSV bank statement:\n\n{text}")),
    };
    GenerateRequest::new(system, user).with_json_schema(transaction_schema())
}

/// One element of the model's JSON array
#[derive(Debug, Deserialize)]
struct ModelTransaction {
    date: String,
    description: String,
    amount: f64,
    #[serde(rename = "type")]
    direction: Direction,
    category: Category,
}

/// Parse the model's transaction array. Any deviation from the schema is an error.
pub fn parse_transactions(resp: &GenerateResponse) -> Result<Vec<Transaction>, PipelineError> {
    let text = resp
        .first_text()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            PipelineError::MalformedModelResponse(
                "API response was empty or incorrectly structured.".to_string(),
            )
        })?;

    let raw: Vec<ModelTransaction> = serde_json::from_str(text)
        .map_err(|e| PipelineError::MalformedModelResponse(format!("invalid transaction JSON: {e}")))?;

    raw.into_iter()
        .enumerate()
        .map(|(i, t)| {
            let date = NaiveDate::parse_from_str(&t.date, "%Y-%m-%d").map_err(|e| {
                PipelineError::MalformedModelResponse(format!("transaction {i}: bad date {:?}: {e}", t.date))
            })?;
            if !t.amount.is_finite() || t.amount < 0.0 {
                return Err(PipelineError::MalformedModelResponse(format!(
                    "transaction {i}: amount must be a non-negative number, got {}",
                    t.amount
                )));
            }
            Ok(Transaction::new(i.to_string(), date, t.description, t.amount, t.direction, t.category))
        })
        .collect()
}

/// Extract and categorize the transactions in `text`.
///
/// Transport failures are retried by the client; a malformed response is not.
pub async fn categorize(
    client: &ModelClient,
    text: &str,
    kind: DocumentKind,
) -> Result<Vec<Transaction>, PipelineError> {
    let request = categorization_request(text, kind);
    let resp = client.call(&request).await?;
    let txns = parse_transactions(&resp)?;
    debug!(count = txns.len(), kind = kind.label(), "categorized transactions");
    Ok(txns)
}
