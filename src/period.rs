use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{consts::{BIWEEKLY_SPAN_DAYS, DEFAULT_CYCLE_START_DAY, WEEKLY_SPAN_DAYS}, entity::{company, payment_period, sea_orm_active_enums::PaymentFrequency}, utils};

/// Payroll cycle settings of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub frequency: PaymentFrequency,
    pub cycle_start_day: Option<i16>,
}

impl CycleConfig {
    /// January day the biweekly cycle is anchored on, falling back to the 1st when unset or out of range
    pub fn anchor_day(&self) -> i16 {
        match self.cycle_start_day {
            Some(day @ 1..=31) => day,
            _ => DEFAULT_CYCLE_START_DAY,
        }
    }
}

impl From<&company::Model> for CycleConfig {
    fn from(company: &company::Model) -> Self {
        Self {
            frequency: company.default_payment_frequency,
            cycle_start_day: company.payment_cycle_start_day,
        }
    }
}

/// Inclusive calendar date range of a pay period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<&payment_period::Model> for PeriodBounds {
    fn from(period: &payment_period::Model) -> Self {
        Self {
            start: period.period_start_date,
            end: period.period_end_date,
        }
    }
}

impl PeriodBounds {
    /// Bounds of the period that contains `target`, `None` when they fall outside the supported date range
    ///
    /// Weekly periods always start on Monday, whatever `cycle_start_day` says. Only biweekly
    /// periods honor the configured day.
    pub fn containing(target: NaiveDate, config: &CycleConfig) -> Option<Self> {
        match config.frequency {
            PaymentFrequency::Weekly => {
                let start = utils::start_of_week(target)?;

                Some(Self { start, end: start.checked_add_signed(Duration::days(WEEKLY_SPAN_DAYS - 1))? })
            },
            PaymentFrequency::Biweekly => {
                let anchor = utils::start_of_year(target).checked_add_signed(Duration::days(config.anchor_day() as i64 - 1))?;

                // Floor division so dates before the anchor land in the period that ends right before it
                let period_number = (target - anchor).num_days().div_euclid(BIWEEKLY_SPAN_DAYS);
                let start = anchor.checked_add_signed(Duration::days(period_number * BIWEEKLY_SPAN_DAYS))?;

                Some(Self { start, end: start.checked_add_signed(Duration::days(BIWEEKLY_SPAN_DAYS - 1))? })
            },
            PaymentFrequency::Monthly => Some(Self {
                start: utils::start_of_month(target),
                end: utils::end_of_month(target),
            }),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn next(&self, config: &CycleConfig) -> Option<Self> {
        Self::containing(self.end.succ_opt()?, config)
    }

    pub fn previous(&self, config: &CycleConfig) -> Option<Self> {
        Self::containing(self.start.pred_opt()?, config)
    }

    /// `count` consecutive periods starting with the one that contains `from`
    pub fn upcoming(from: NaiveDate, count: u32, config: &CycleConfig) -> Option<Vec<Self>> {
        let mut periods = Vec::with_capacity(count as usize);
        if count == 0 {
            return Some(periods);
        }

        let mut current = Self::containing(from, config)?;
        periods.push(current);

        for _ in 1..count {
            current = current.next(config)?;
            periods.push(current);
        }

        Some(periods)
    }
}
