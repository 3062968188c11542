//! Read models built from ledger entities.
//!
//! Pure functions: callers load the rows and pass the clock reading in.

use super::due_dates::{days_paid_late, days_until_due, is_urgent, MOST_URGENT_LIMIT};
use super::entities::{Account, Receipt, TransactionRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared_types::{
    AccountId, AccountStatistics, AccountStatus, AccountValidation, AccountsSummary,
    BalanceSummary, HistorySummary, Money, PaidReceipt, PendingReceipts, ReceiptHistory,
    ReceiptHistoryEntry, ReceiptStatistics, ReceiptSummary, ReceiptTotals, TransactionEntry,
    TransactionHistory,
};

pub fn receipt_summary(receipt: &Receipt, now: DateTime<Utc>) -> ReceiptSummary {
    ReceiptSummary {
        id_recibo: receipt.id,
        numero_cuenta: receipt.account_id.clone(),
        monto: receipt.amount,
        fecha: receipt.issued_at,
        fecha_vencimiento: receipt.due_date,
        estado: receipt.status(),
        concepto_pago: receipt.concept.clone(),
        periodo_facturacion: receipt.billing_period.clone(),
        consumo_kwh: receipt.consumption_kwh,
        dias_para_vencer: days_until_due(receipt.due_date, now),
        es_urgente: is_urgent(receipt.due_date, now),
    }
}

/// `receipts` must be the account's pending receipts, earliest due first.
pub fn pending_receipts(
    account: &Account,
    receipts: &[Receipt],
    now: DateTime<Utc>,
) -> PendingReceipts {
    let recibos: Vec<ReceiptSummary> = receipts
        .iter()
        .map(|r| receipt_summary(r, now))
        .collect();
    let monto_total: Money = receipts.iter().map(|r| r.amount).sum();
    let recibos_mas_urgentes = recibos
        .iter()
        .filter(|r| r.es_urgente)
        .take(MOST_URGENT_LIMIT)
        .cloned()
        .collect();

    PendingReceipts {
        numero_cuenta: account.id.clone(),
        saldo_disponible: account.balance,
        total_recibos: recibos.len(),
        puede_pagar_todos: account.balance >= monto_total,
        monto_total,
        recibos,
        recibos_mas_urgentes,
    }
}

/// `receipts` must be every receipt of the account, paid or pending.
pub fn balance_summary(account: &Account, receipts: &[Receipt]) -> BalanceSummary {
    let monto_pendiente: Money = receipts
        .iter()
        .filter(|r| !r.is_paid())
        .map(|r| r.amount)
        .sum();
    BalanceSummary {
        numero_cuenta: account.id.clone(),
        saldo: account.balance,
        nombre_titular: account.holder_name.clone(),
        estado: account.status,
        fecha_creacion: account.created_at,
        estadisticas: AccountStatistics {
            total_recibos: receipts.len(),
            saldo_disponible: account.balance - monto_pendiente,
            monto_pendiente,
        },
    }
}

/// Returns `None` when the receipt has not been paid.
pub fn paid_receipt(account: &Account, receipt: &Receipt) -> Option<PaidReceipt> {
    let payment = receipt.payment.as_ref()?;
    Some(PaidReceipt {
        id_recibo: receipt.id,
        numero_cuenta: receipt.account_id.clone(),
        monto: receipt.amount,
        fecha: receipt.issued_at,
        fecha_vencimiento: receipt.due_date,
        fecha_pago: payment.paid_at,
        estado: receipt.status(),
        concepto_pago: receipt.concept.clone(),
        periodo_facturacion: receipt.billing_period.clone(),
        consumo_kwh: receipt.consumption_kwh,
        metodo_pago: payment.method.clone(),
        numero_transaccion: payment.transaction_number.clone(),
        nombre_titular: account.holder_name.clone(),
        saldo_actual: account.balance,
        dias_pagado_despues_vencimiento: days_paid_late(receipt.due_date, payment.paid_at),
        es_recibo_pagado_a_tiempo: payment.paid_at <= receipt.due_date,
    })
}

pub fn transaction_entry(record: &TransactionRecord) -> TransactionEntry {
    TransactionEntry {
        id_transaccion: record.id,
        tipo_transaccion: record.kind,
        monto_anterior: record.balance_before,
        monto_transaccion: record.amount,
        monto_nuevo: record.balance_after,
        fecha_transaccion: record.timestamp,
        descripcion: record.description.clone(),
        id_recibo: record.receipt_id,
    }
}

/// `records` must already be newest first and limited.
pub fn transaction_history(account: &Account, records: &[TransactionRecord]) -> TransactionHistory {
    let (debits, credits): (Vec<_>, Vec<_>) = records.iter().partition(|r| r.kind.is_debit());

    TransactionHistory {
        numero_cuenta: account.id.clone(),
        transacciones: records.iter().map(transaction_entry).collect(),
        total_transacciones: records.len(),
        resumen: HistorySummary {
            total_debitos: debits.len(),
            total_creditos: credits.len(),
            monto_total_debitos: debits.iter().map(|r| r.amount).sum(),
            monto_total_creditos: credits.iter().map(|r| r.amount).sum(),
        },
    }
}

fn average(total: Money, count: usize) -> Money {
    if count == 0 {
        return Money::ZERO;
    }
    Money::new(total.as_decimal() / Decimal::from(count))
}

/// `receipts` must already be newest first; `total` counts all of them.
pub fn receipt_history(account: &Account, receipts: &[Receipt], total: usize) -> ReceiptHistory {
    let historial = receipts
        .iter()
        .map(|r| ReceiptHistoryEntry {
            id_recibo: r.id,
            monto: r.amount,
            fecha: r.issued_at,
            fecha_vencimiento: r.due_date,
            fecha_pago: r.payment.as_ref().map(|p| p.paid_at),
            estado: r.status(),
            periodo_facturacion: r.billing_period.clone(),
            numero_transaccion: r.payment.as_ref().map(|p| p.transaction_number.clone()),
        })
        .collect();

    ReceiptHistory {
        numero_cuenta: account.id.clone(),
        historial,
        total_recibos: total,
    }
}

pub fn receipt_statistics(account: &Account, receipts: &[Receipt]) -> ReceiptStatistics {
    let (paid, pending): (Vec<&Receipt>, Vec<&Receipt>) =
        receipts.iter().partition(|r| r.is_paid());
    let monto_pagado: Money = paid.iter().map(|r| r.amount).sum();

    ReceiptStatistics {
        numero_cuenta: account.id.clone(),
        estadisticas: ReceiptTotals {
            total_recibos: receipts.len(),
            recibos_pendientes: pending.len(),
            recibos_pagados: paid.len(),
            monto_pendiente: pending.iter().map(|r| r.amount).sum(),
            promedio_factura: average(monto_pagado, paid.len()),
            monto_pagado,
        },
    }
}

pub fn account_validation(id: &AccountId, account: Option<&Account>) -> AccountValidation {
    let Some(account) = account else {
        return AccountValidation {
            existe: false,
            activa: false,
            numero_cuenta: None,
            nombre_titular: None,
            estado: None,
            mensaje: format!("Account {id} not found"),
        };
    };

    let activa = account.is_active();
    AccountValidation {
        existe: true,
        activa,
        numero_cuenta: Some(account.id.clone()),
        nombre_titular: Some(account.holder_name.clone()),
        estado: Some(account.status),
        mensaje: if activa {
            "Account is valid".to_string()
        } else {
            format!("Account is {}", account.status.as_str())
        },
    }
}

pub fn accounts_summary(accounts: &[Account]) -> AccountsSummary {
    let count = |status: AccountStatus| accounts.iter().filter(|a| a.status == status).count();
    let saldo_total: Money = accounts.iter().map(|a| a.balance).sum();

    AccountsSummary {
        total_cuentas: accounts.len(),
        saldo_promedio: average(saldo_total, accounts.len()),
        saldo_total,
        cuentas_activas: count(AccountStatus::Active),
        cuentas_inactivas: count(AccountStatus::Inactive),
        cuentas_suspendidas: count(AccountStatus::Suspended),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ReceiptPayment;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use shared_types::{ReceiptId, ReceiptStatus};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    fn account(balance: Money) -> Account {
        Account::new(AccountId::parse("ABC").unwrap(), "Ana Torres", balance, now())
    }

    fn receipt(id: i64, amount: Money, due_in_days: i64) -> Receipt {
        Receipt::pending(
            ReceiptId::new(id).unwrap(),
            AccountId::parse("ABC").unwrap(),
            amount,
            now() - Duration::days(20),
            now() + Duration::days(due_in_days),
        )
    }

    #[test]
    fn test_pending_receipts_totals_and_urgency() {
        let receipts = vec![
            receipt(1, Money::new(dec!(10)), 1),
            receipt(2, Money::new(dec!(20)), 2),
            receipt(3, Money::new(dec!(30)), 3),
            receipt(4, Money::new(dec!(40)), 4),
            receipt(5, Money::new(dec!(50)), 12),
        ];
        let view = pending_receipts(&account(Money::new(dec!(100))), &receipts, now());

        assert_eq!(view.total_recibos, 5);
        assert_eq!(view.monto_total, Money::new(dec!(150)));
        assert!(!view.puede_pagar_todos);
        let urgent: Vec<i64> = view
            .recibos_mas_urgentes
            .iter()
            .map(|r| r.id_recibo.value())
            .collect();
        assert_eq!(urgent, vec![1, 2, 3]);
        assert!(!view.recibos[4].es_urgente);
        assert_eq!(view.recibos[4].dias_para_vencer, 12);
    }

    #[test]
    fn test_empty_account_can_pay_all() {
        let view = pending_receipts(&account(Money::ZERO), &[], now());
        assert_eq!(view.monto_total, Money::ZERO);
        assert!(view.puede_pagar_todos);
        assert!(view.recibos_mas_urgentes.is_empty());
    }

    #[test]
    fn test_paid_receipt_requires_payment() {
        let acct = account(Money::new(dec!(5)));
        let mut r = receipt(7, Money::new(dec!(25)), -1);
        assert!(paid_receipt(&acct, &r).is_none());

        r.payment = Some(ReceiptPayment {
            paid_at: now(),
            method: "Saldo en cuenta".into(),
            transaction_number: "TXN-1-7".into(),
        });
        let view = paid_receipt(&acct, &r).unwrap();
        assert!(!view.es_recibo_pagado_a_tiempo);
        assert_eq!(view.dias_pagado_despues_vencimiento, 1);
        assert_eq!(view.saldo_actual, Money::new(dec!(5)));
    }

    fn paid(mut r: Receipt) -> Receipt {
        r.payment = Some(ReceiptPayment {
            paid_at: now(),
            method: "Saldo en cuenta".into(),
            transaction_number: format!("TXN-1-{}", r.id),
        });
        r
    }

    #[test]
    fn test_balance_statistics_cover_all_receipts() {
        let receipts = vec![
            paid(receipt(1, Money::new(dec!(70)), -5)),
            receipt(2, Money::new(dec!(40)), 3),
            receipt(3, Money::new(dec!(80)), 9),
        ];
        let view = balance_summary(&account(Money::new(dec!(100))), &receipts);

        assert_eq!(view.estadisticas.total_recibos, 3);
        assert_eq!(view.estadisticas.monto_pendiente, Money::new(dec!(120)));
        assert_eq!(view.estadisticas.saldo_disponible, Money::new(dec!(-20)));
    }

    #[test]
    fn test_receipt_statistics_split_and_average() {
        let receipts = vec![
            paid(receipt(1, Money::new(dec!(10)), -5)),
            paid(receipt(2, Money::new(dec!(15)), -2)),
            receipt(3, Money::new(dec!(40)), 3),
        ];
        let stats = receipt_statistics(&account(Money::ZERO), &receipts).estadisticas;

        assert_eq!(stats.total_recibos, 3);
        assert_eq!(stats.recibos_pagados, 2);
        assert_eq!(stats.recibos_pendientes, 1);
        assert_eq!(stats.monto_pagado, Money::new(dec!(25)));
        assert_eq!(stats.monto_pendiente, Money::new(dec!(40)));
        assert_eq!(stats.promedio_factura, Money::new(dec!(12.50)));

        let empty = receipt_statistics(&account(Money::ZERO), &[]).estadisticas;
        assert_eq!(empty.promedio_factura, Money::ZERO);
    }

    #[test]
    fn test_receipt_history_entries_carry_payment() {
        let receipts = vec![paid(receipt(9, Money::new(dec!(30)), -1)), receipt(8, Money::new(dec!(5)), 2)];
        let view = receipt_history(&account(Money::ZERO), &receipts, 12);

        assert_eq!(view.total_recibos, 12);
        assert_eq!(view.historial.len(), 2);
        assert_eq!(view.historial[0].estado, ReceiptStatus::Paid);
        assert_eq!(view.historial[0].fecha_pago, Some(now()));
        assert_eq!(view.historial[0].numero_transaccion.as_deref(), Some("TXN-1-9"));
        assert_eq!(view.historial[1].fecha_pago, None);
        assert_eq!(view.historial[1].numero_transaccion, None);
    }

    #[test]
    fn test_account_validation_messages() {
        let id = AccountId::parse("ABC").unwrap();
        let missing = account_validation(&id, None);
        assert!(!missing.existe && !missing.activa);
        assert_eq!(missing.estado, None);

        let active = account(Money::ZERO);
        let valid = account_validation(&id, Some(&active));
        assert!(valid.existe && valid.activa);
        assert_eq!(valid.mensaje, "Account is valid");

        let suspended = account(Money::ZERO).with_status(AccountStatus::Suspended);
        let view = account_validation(&id, Some(&suspended));
        assert!(view.existe && !view.activa);
        assert_eq!(view.estado, Some(AccountStatus::Suspended));
        assert_eq!(view.mensaje, "Account is suspended");
    }

    #[test]
    fn test_accounts_summary_counts_statuses() {
        let accounts = vec![
            account(Money::new(dec!(100))),
            account(Money::new(dec!(50))).with_status(AccountStatus::Inactive),
            account(Money::new(dec!(0.01))).with_status(AccountStatus::Suspended),
        ];
        let summary = accounts_summary(&accounts);

        assert_eq!(summary.total_cuentas, 3);
        assert_eq!(summary.saldo_total, Money::new(dec!(150.01)));
        assert_eq!(summary.saldo_promedio, Money::new(dec!(50.00)));
        assert_eq!(
            (summary.cuentas_activas, summary.cuentas_inactivas, summary.cuentas_suspendidas),
            (1, 1, 1)
        );

        assert_eq!(accounts_summary(&[]).saldo_promedio, Money::ZERO);
    }
}
