//! Compound-growth projection of the bank.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::iter::FusedIterator;

pub const PROJECTION_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionDay {
    pub day: u32,
    pub date: NaiveDate,
    pub daily_profit: f64,
    pub projected_bank: f64,
}

/// A fixed-horizon projection. Cheap to copy; every call to [`Projection::iter`]
/// starts again from day 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    start_balance: f64,
    daily_rate: f64,
    start_date: NaiveDate,
    days: u32,
}

impl Projection {
    /// `daily_rate` is a fraction (0.1 for 10%). Entry `i` is dated `start_date + i`.
    pub fn new(start_balance: f64, daily_rate: f64, start_date: NaiveDate) -> Self {
        Self {
            start_balance,
            daily_rate,
            start_date,
            days: PROJECTION_DAYS,
        }
    }

    pub fn start_balance(&self) -> f64 {
        self.start_balance
    }

    pub fn daily_rate(&self) -> f64 {
        self.daily_rate
    }

    pub fn len(&self) -> usize {
        self.days as usize
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    pub fn iter(&self) -> ProjectionIter {
        ProjectionIter {
            projection: *self,
            day: 0,
            balance: self.start_balance,
        }
    }

    /// Balance at the end of the horizon.
    pub fn final_balance(&self) -> f64 {
        self.iter()
            .last()
            .map(|d| d.projected_bank)
            .unwrap_or(self.start_balance)
    }
}

impl<'a> IntoIterator for &'a Projection {
    type Item = ProjectionDay;
    type IntoIter = ProjectionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionIter {
    projection: Projection,
    day: u32,
    balance: f64,
}

impl Iterator for ProjectionIter {
    type Item = ProjectionDay;

    fn next(&mut self) -> Option<Self::Item> {
        if self.day >= self.projection.days {
            return None;
        }
        let day = self.day + 1;
        let date = self
            .projection
            .start_date
            .checked_add_days(Days::new(u64::from(day)))?;

        let daily_profit = self.balance * self.projection.daily_rate;
        self.balance += daily_profit;
        self.day = day;

        Some(ProjectionDay {
            day,
            date,
            daily_profit,
            projected_bank: self.balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.projection.days - self.day) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProjectionIter {}

impl FusedIterator for ProjectionIter {}
