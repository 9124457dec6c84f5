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

use crate::buffer::Reader;
use crate::error::Error;
use crate::serializer::PodSerial;

impl PodSerial for bool {
    const BYTE_LEN: Option<usize> = Some(1);

    fn pod_bytes(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match Reader::new(bytes).read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::malformed(format!("invalid boolean byte {other:#x}"))),
        }
    }

    fn pod_text(&self) -> String {
        self.to_string()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        text.trim()
            .parse::<bool>()
            .map_err(|e| Error::parse_error(format!("invalid bool literal {text:?}: {e}")))
    }
}
