//! # Reply Payloads
//!
//! Typed `data` objects of successful replies. Field names follow the wire
//! protocol (camelCase Spanish), so these structs are the contract between
//! the ledger that produces them and the client that decodes them.

use crate::entities::{AccountId, Money, ReceiptId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// Receipt status. Moves `Pending -> Paid` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Paid,
}

/// Ledger record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Charge,
    Credit,
    Payment,
}

impl TransactionKind {
    /// True for kinds that reduce the balance.
    pub fn is_debit(&self) -> bool {
        matches!(self, Self::Charge | Self::Payment)
    }
}

/// One pending receipt as listed by `consultar_recibo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub id_recibo: ReceiptId,
    pub numero_cuenta: AccountId,
    pub monto: Money,
    pub fecha: DateTime<Utc>,
    pub fecha_vencimiento: DateTime<Utc>,
    pub estado: ReceiptStatus,
    pub concepto_pago: String,
    pub periodo_facturacion: String,
    pub consumo_kwh: f64,
    pub dias_para_vencer: i64,
    pub es_urgente: bool,
}

/// `consultar_recibo` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReceipts {
    pub numero_cuenta: AccountId,
    pub saldo_disponible: Money,
    pub recibos: Vec<ReceiptSummary>,
    pub total_recibos: usize,
    pub monto_total: Money,
    pub puede_pagar_todos: bool,
    pub recibos_mas_urgentes: Vec<ReceiptSummary>,
}

/// Per-account receipt statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatistics {
    /// Every receipt of the account, paid or pending.
    pub total_recibos: usize,
    pub monto_pendiente: Money,
    /// Balance left after covering every pending receipt. May be negative.
    pub saldo_disponible: Money,
}

/// `obtener_saldo` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub numero_cuenta: AccountId,
    pub saldo: Money,
    pub nombre_titular: String,
    pub estado: AccountStatus,
    pub fecha_creacion: DateTime<Utc>,
    pub estadisticas: AccountStatistics,
}

/// `obtener_recibo` payload: a paid receipt with payment details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidReceipt {
    pub id_recibo: ReceiptId,
    pub numero_cuenta: AccountId,
    pub monto: Money,
    pub fecha: DateTime<Utc>,
    pub fecha_vencimiento: DateTime<Utc>,
    pub fecha_pago: DateTime<Utc>,
    pub estado: ReceiptStatus,
    pub concepto_pago: String,
    pub periodo_facturacion: String,
    pub consumo_kwh: f64,
    pub metodo_pago: String,
    pub numero_transaccion: String,
    pub nombre_titular: String,
    pub saldo_actual: Money,
    pub dias_pagado_despues_vencimiento: i64,
    pub es_recibo_pagado_a_tiempo: bool,
}

/// `procesar_pago` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub id_recibo: ReceiptId,
    pub numero_cuenta: AccountId,
    pub id_transaccion: TransactionId,
    pub numero_transaccion: String,
    pub monto_pagado: Money,
    pub fecha_pago: DateTime<Utc>,
    pub nuevo_saldo: Money,
    pub metodo_pago: String,
}

/// Result of crediting an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeResult {
    pub numero_cuenta: AccountId,
    pub id_transaccion: TransactionId,
    pub monto_recargado: Money,
    pub saldo_anterior: Money,
    pub nuevo_saldo: Money,
    pub fecha_recarga: DateTime<Utc>,
}

/// One ledger record as exposed in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub id_transaccion: TransactionId,
    pub tipo_transaccion: TransactionKind,
    pub monto_anterior: Money,
    pub monto_transaccion: Money,
    pub monto_nuevo: Money,
    pub fecha_transaccion: DateTime<Utc>,
    pub descripcion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_recibo: Option<ReceiptId>,
}

/// Debit/credit totals of a history page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total_debitos: usize,
    pub total_creditos: usize,
    pub monto_total_debitos: Money,
    pub monto_total_creditos: Money,
}

/// Most recent ledger records of an account, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistory {
    pub numero_cuenta: AccountId,
    pub transacciones: Vec<TransactionEntry>,
    pub total_transacciones: usize,
    pub resumen: HistorySummary,
}

/// One receipt in the account's receipt history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptHistoryEntry {
    pub id_recibo: ReceiptId,
    pub monto: Money,
    pub fecha: DateTime<Utc>,
    pub fecha_vencimiento: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha_pago: Option<DateTime<Utc>>,
    pub estado: ReceiptStatus,
    pub periodo_facturacion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero_transaccion: Option<String>,
}

/// Most recently issued receipts of an account, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptHistory {
    pub numero_cuenta: AccountId,
    pub historial: Vec<ReceiptHistoryEntry>,
    pub total_recibos: usize,
}

/// Pending/paid counts and amounts over all receipts of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptTotals {
    pub total_recibos: usize,
    pub recibos_pendientes: usize,
    pub recibos_pagados: usize,
    pub monto_pendiente: Money,
    pub monto_pagado: Money,
    /// Mean amount of paid receipts, zero when none is paid.
    pub promedio_factura: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptStatistics {
    pub numero_cuenta: AccountId,
    pub estadisticas: ReceiptTotals,
}

/// Whether an account exists and may operate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValidation {
    pub existe: bool,
    pub activa: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero_cuenta: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_titular: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<AccountStatus>,
    pub mensaje: String,
}

/// Totals across every account, for administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsSummary {
    pub total_cuentas: usize,
    pub saldo_total: Money,
    /// Zero when there are no accounts.
    pub saldo_promedio: Money,
    pub cuentas_activas: usize,
    pub cuentas_inactivas: usize,
    pub cuentas_suspendidas: usize,
}
