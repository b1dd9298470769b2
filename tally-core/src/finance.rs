//! Transaction types produced by categorization

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A categorized transaction as returned by the model and stored with a statement.
///
/// `amount_string` is derived from `amount` and `direction` at construction and
/// regenerated on deserialization, so it never drifts from the other two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredTransaction")]
pub struct Transaction {
    /// Sub-identifier within the parent statement
    pub id: String,
    /// Booking date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Cleaned description
    pub description: String,
    amount: f64,
    amount_string: String,
    #[serde(rename = "type")]
    direction: Direction,
    /// One of the fixed categories
    pub category: Category,
}

/// Direction of money flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    #[serde(rename = "Money In")]
    MoneyIn,
    #[serde(rename = "Money Out")]
    MoneyOut,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::MoneyIn => "Money In",
            Direction::MoneyOut => "Money Out",
        }
    }

    fn sign(&self) -> char {
        match self {
            Direction::MoneyIn => '+',
            Direction::MoneyOut => '-',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of categories the model may assign
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Transport/Travel")]
    TransportTravel,
    #[serde(rename = "Telecom/Utilities")]
    TelecomUtilities,
    #[serde(rename = "Childcare/Education")]
    ChildcareEducation,
    #[serde(rename = "Transfer/Payment")]
    TransferPayment,
    #[serde(rename = "Salary/Income")]
    SalaryIncome,
    #[serde(rename = "Fees/Other")]
    FeesOther,
    #[serde(rename = "Refunds")]
    Refunds,
    #[serde(rename = "Dining/Fast Food")]
    DiningFastFood,
    #[serde(rename = "Online Subscription")]
    OnlineSubscription,
    #[serde(rename = "Personal Finance")]
    PersonalFinance,
    #[serde(rename = "Leisure/Hobby")]
    LeisureHobby,
}

impl Category {
    /// Every category, in the order the response schema lists them
    pub const ALL: [Category; 13] = [
        Category::Groceries,
        Category::Shopping,
        Category::TransportTravel,
        Category::TelecomUtilities,
        Category::ChildcareEducation,
        Category::TransferPayment,
        Category::SalaryIncome,
        Category::FeesOther,
        Category::Refunds,
        Category::DiningFastFood,
        Category::OnlineSubscription,
        Category::PersonalFinance,
        Category::LeisureHobby,
    ];

    /// Wire label, e.g. `"Dining/Fast Food"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Shopping => "Shopping",
            Category::TransportTravel => "Transport/Travel",
            Category::TelecomUtilities => "Telecom/Utilities",
            Category::ChildcareEducation => "Childcare/Education",
            Category::TransferPayment => "Transfer/Payment",
            Category::SalaryIncome => "Salary/Income",
            Category::FeesOther => "Fees/Other",
            Category::Refunds => "Refunds",
            Category::DiningFastFood => "Dining/Fast Food",
            Category::OnlineSubscription => "Online Subscription",
            Category::PersonalFinance => "Personal Finance",
            Category::LeisureHobby => "Leisure/Hobby",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

/// Display value for an amount, e.g. `-€42.50`
pub fn amount_string(amount: f64, direction: Direction) -> String {
    format!("{}€{}", direction.sign(), two_decimals(amount))
}

/// Two-decimal rendering with exact halves rounded away from zero (`0.125` → `0.13`).
///
/// `{:.2}` rounds exact ties to even. The only exact ties a double can hold
/// are odd multiples of 1/8, which scale by 8 and 100 without error.
pub fn two_decimals(v: f64) -> String {
    let eighths = v * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        let cents = (v.abs() * 100.0).ceil().copysign(v);
        return format!("{:.2}", cents / 100.0);
    }
    format!("{v:.2}")
}

impl Transaction {
    /// Create a new Transaction; `amount` is the non-negative magnitude
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
        direction: Direction,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            description: description.into(),
            amount,
            amount_string: amount_string(amount, direction),
            direction,
            category,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount_string(&self) -> &str {
        &self.amount_string
    }

    /// Returns true if money left the account
    pub fn is_expense(&self) -> bool {
        self.direction == Direction::MoneyOut
    }

    /// Returns true if money entered the account
    pub fn is_income(&self) -> bool {
        self.direction == Direction::MoneyIn
    }

    /// Signed amount: positive for income, negative for expenses
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            Direction::MoneyIn => self.amount,
            Direction::MoneyOut => -self.amount,
        }
    }
}

/// On-disk shape; `amountString` is accepted but recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTransaction {
    id: String,
    date: NaiveDate,
    description: String,
    amount: f64,
    #[serde(rename = "type")]
    direction: Direction,
    category: Category,
}

impl From<StoredTransaction> for Transaction {
    fn from(s: StoredTransaction) -> Self {
        Transaction::new(s.id, s.date, s.description, s.amount, s.direction, s.category)
    }
}

/// Money in/out totals and the biggest spending categories of a statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementSummary {
    pub total_in: f64,
    pub total_out: f64,
    pub net: f64,
    /// Up to five Money Out categories, largest spend first
    pub top_categories: Vec<(Category, f64)>,
}

impl StatementSummary {
    pub fn from_transactions(txns: &[Transaction]) -> Self {
        let total_in: f64 = txns.iter().filter(|t| t.is_income()).map(|t| t.amount).sum();
        let total_out: f64 = txns.iter().filter(|t| t.is_expense()).map(|t| t.amount).sum();

        let mut by_category: HashMap<Category, f64> = HashMap::new();
        for t in txns.iter().filter(|t| t.is_expense()) {
            *by_category.entry(t.category).or_insert(0.0) += t.amount;
        }

        let mut top_categories: Vec<(Category, f64)> = by_category.into_iter().collect();
        // Ties broken by category order so output is stable
        top_categories.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        top_categories.truncate(5);

        Self {
            total_in,
            total_out,
            net: total_in - total_out,
            top_categories,
        }
    }

    /// Net flow with explicit sign, e.g. `+€12.00`
    pub fn net_string(&self) -> String {
        let direction = if self.net >= 0.0 {
            Direction::MoneyIn
        } else {
            Direction::MoneyOut
        };
        amount_string(self.net.abs(), direction)
    }
}
