// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Calendar PODs: timestamps travel as microseconds since the Unix
//! epoch, dates as days since the common era.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::serializer::PodSerial;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

impl PodSerial for NaiveDateTime {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_i64(self.and_utc().timestamp_micros());
        writer.dump()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let micros = Reader::new(bytes).read_i64()?;
        DateTime::<Utc>::from_timestamp_micros(micros)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| Error::malformed(format!("timestamp {micros}us out of range")))
    }

    fn pod_text(&self) -> String {
        self.format(DATETIME_FORMAT).to_string()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
            .map_err(|e| Error::parse_error(format!("invalid timestamp {text:?}: {e}")))
    }
}

impl PodSerial for NaiveDate {
    const BYTE_LEN: Option<usize> = Some(4);

    fn pod_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_i32(self.num_days_from_ce());
        writer.dump()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let days = Reader::new(bytes).read_i32()?;
        NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or_else(|| Error::malformed(format!("date {days} days from CE out of range")))
    }

    fn pod_text(&self) -> String {
        self.format(DATE_FORMAT).to_string()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map_err(|e| Error::parse_error(format!("invalid date {text:?}: {e}")))
    }
}
