// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bank,
    Ewallet,
    Cash,
    Other,
}

impl FromStr for SourceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bank" => Ok(SourceKind::Bank),
            "ewallet" | "e-wallet" | "wallet" => Ok(SourceKind::Ewallet),
            "cash" => Ok(SourceKind::Cash),
            "other" => Ok(SourceKind::Other),
            _ => Err(format!("Invalid source kind: {}", s)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Bank => write!(f, "bank"),
            SourceKind::Ewallet => write!(f, "ewallet"),
            SourceKind::Cash => write!(f, "cash"),
            SourceKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Accepts postings.
    Available,
    /// Soft-locked: kept for history, rejects new postings.
    Locked,
    Unavailable,
}

impl SourceStatus {
    pub fn allows_posting(self) -> bool {
        matches!(self, SourceStatus::Available)
    }
}

impl FromStr for SourceStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(SourceStatus::Available),
            "locked" => Ok(SourceStatus::Locked),
            "unavailable" => Ok(SourceStatus::Unavailable),
            _ => Err(format!("Invalid source status: {}", s)),
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Available => write!(f, "available"),
            SourceStatus::Locked => write!(f, "locked"),
            SourceStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Sign-carrying kind shared by categories and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Expense,
    Income,
}

impl TxKind {
    /// Signed ledger amount for a positive magnitude.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TxKind::Expense => -amount,
            TxKind::Income => amount,
        }
    }
}

impl FromStr for TxKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(TxKind::Expense),
            "income" => Ok(TxKind::Income),
            _ => Err(format!("Invalid transaction kind: {}", s)),
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Expense => write!(f, "expense"),
            TxKind::Income => write!(f, "income"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Expense,
    Income,
    Reminder,
    Prediction,
}

impl EventKind {
    /// Expense, income and prediction events describe money moving and
    /// must carry an amount; reminders need not.
    pub fn requires_amount(self) -> bool {
        !matches!(self, EventKind::Reminder)
    }

    /// Kinds that contribute to per-day income/expense aggregates.
    pub fn counts_toward_totals(self) -> Option<TxKind> {
        match self {
            EventKind::Expense => Some(TxKind::Expense),
            EventKind::Income => Some(TxKind::Income),
            EventKind::Reminder | EventKind::Prediction => None,
        }
    }
}

impl FromStr for EventKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(EventKind::Expense),
            "income" => Ok(EventKind::Income),
            "reminder" => Ok(EventKind::Reminder),
            "prediction" => Ok(EventKind::Prediction),
            _ => Err(format!("Invalid event kind: {}", s)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Expense => write!(f, "expense"),
            EventKind::Income => write!(f, "income"),
            EventKind::Reminder => write!(f, "reminder"),
            EventKind::Prediction => write!(f, "prediction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    #[serde(rename = "bi-weekly")]
    BiWeekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "bi-weekly" | "biweekly" => Ok(Frequency::BiWeekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::BiWeekly => write!(f, "bi-weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Manual,
    PredictionConfirmed,
    AiAssisted,
}

impl FromStr for Provenance {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Provenance::Manual),
            "prediction_confirmed" => Ok(Provenance::PredictionConfirmed),
            "ai_assisted" => Ok(Provenance::AiAssisted),
            _ => Err(format!("Invalid provenance: {}", s)),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Manual => write!(f, "manual"),
            Provenance::PredictionConfirmed => write!(f, "prediction_confirmed"),
            Provenance::AiAssisted => write!(f, "ai_assisted"),
        }
    }
}

/// Terminal state of a prediction event. Unset means still proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Accepted,
    Dismissed,
}

impl FromStr for Resolution {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accepted" => Ok(Resolution::Accepted),
            "dismissed" => Ok(Resolution::Dismissed),
            _ => Err(format!("Invalid resolution: {}", s)),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Accepted => write!(f, "accepted"),
            Resolution::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub kind: SourceKind,
    pub balance: Decimal,
    /// Balance at creation; the ledger never touches it. `doctor` uses it
    /// to recompute the running total from transaction history.
    pub opening_balance: Decimal,
    pub status: SourceStatus,
    pub interest_rate: Option<Decimal>,
    pub interest_period: Option<String>,
    pub transfer_latency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub kind: TxKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TxKind,
    pub description: String,
    pub category_id: Option<i64>,
    pub source_id: i64,
    pub provenance: Provenance,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub amount: Option<Decimal>,
    pub start_date: NaiveDate,
    pub is_recurring: bool,
    pub frequency: Option<Frequency>,
    pub recurrence_count: Option<u32>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub source_id: Option<i64>,
    pub confidence: Option<Decimal>,
    pub pattern: Option<String>,
    pub generator: Option<String>,
    pub resolution: Option<Resolution>,
}

impl CalendarEvent {
    pub fn is_prediction(&self) -> bool {
        self.kind == EventKind::Prediction
    }

    pub fn is_proposed(&self) -> bool {
        self.is_prediction() && self.resolution.is_none()
    }
}
