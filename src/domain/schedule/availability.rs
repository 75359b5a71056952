use std::collections::HashSet;

use bio::data_structures::interval_tree::IntervalTree;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{BookedSet, BusinessCalendar, Interval};

/// 予約済み区間が空き枠をふさぐ条件
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingRule {
    /// 予約の開始時刻と枠の開始時刻が一致したときだけふさぐ
    #[default]
    ExactStart,
    /// 区間が少しでも重なればふさぐ
    Overlap,
}

enum Blocked {
    Starts(HashSet<DateTime<Utc>>),
    Overlaps(IntervalTree<DateTime<Utc>, ()>),
}

impl Blocked {
    fn new(rule: BlockingRule, booked: &BookedSet) -> Self {
        match rule {
            BlockingRule::ExactStart => Blocked::Starts(booked.iter().map(|b| b.start()).collect()),
            BlockingRule::Overlap => {
                Blocked::Overlaps(booked.iter().map(|b| (b.range(), ())).collect())
            }
        }
    }

    fn blocks(&self, slot: &Interval) -> bool {
        match self {
            Blocked::Starts(starts) => starts.contains(&slot.start()),
            Blocked::Overlaps(tree) => tree.find(slot.range()).next().is_some(),
        }
    }
}

/// 空き枠の探索
///
/// 呼び出しごとに入力だけから結果を作るので、並行に何度呼んでもよい。
#[derive(Clone, Copy, Debug)]
pub struct AvailabilityScanner<'a> {
    calendar: &'a BusinessCalendar,
    rule: BlockingRule,
}

impl<'a> AvailabilityScanner<'a> {
    pub fn new(calendar: &'a BusinessCalendar) -> Self {
        Self {
            calendar,
            rule: BlockingRule::default(),
        }
    }

    pub fn with_rule(mut self, rule: BlockingRule) -> Self {
        self.rule = rule;
        self
    }

    /// `[window_start, window_end)` 内の空き枠を時刻順に返す
    ///
    /// 開店前の開始時刻は同じ日の開店まで進める。閉店までに収まらない枠は
    /// 作らず、翌日の開店から続ける。窓の終わりを越える枠も作らない。
    /// 窓が空または逆転していれば空のリストになる。
    pub fn scan(
        &self,
        booked: &BookedSet,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<Interval> {
        let blocked = Blocked::new(self.rule, booked);
        let calendar = self.calendar;
        let slot_duration = calendar.slot_duration();

        let mut open = Vec::new();
        let mut cursor = calendar.clamp_to_opening(window_start);
        while cursor + slot_duration <= window_end {
            let slot = match Interval::starting_at(cursor, slot_duration) {
                Ok(slot) => slot,
                Err(_) => break,
            };
            if !calendar.is_valid_slot(&slot) {
                // 閉店までに収まらないので翌日へ
                cursor = calendar.next_opening(cursor);
                continue;
            }
            if !blocked.blocks(&slot) {
                open.push(slot);
            }
            cursor = slot.end();
        }
        open
    }
}

/// 既定の条件で空き枠を探す
pub fn find_availability(
    calendar: &BusinessCalendar,
    booked: &BookedSet,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Interval> {
    AvailabilityScanner::new(calendar).scan(booked, window_start, window_end)
}
