// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use jiff::Timestamp;

/// The source of timestamps naming and expiring rotated files.
#[derive(Debug, Clone, Default)]
pub(crate) enum Clock {
    #[default]
    System,
    /// A shared time that tests move forward by hand. Clones observe the same time.
    #[cfg(test)]
    Manual(std::sync::Arc<std::sync::Mutex<Timestamp>>),
}

impl Clock {
    pub(crate) fn now(&self) -> Timestamp {
        match self {
            Clock::System => Timestamp::now(),
            #[cfg(test)]
            Clock::Manual(now) => *now.lock().unwrap(),
        }
    }

    #[cfg(test)]
    pub(crate) fn manual(start: Timestamp) -> Clock {
        Clock::Manual(std::sync::Arc::new(std::sync::Mutex::new(start)))
    }

    #[cfg(test)]
    pub(crate) fn advance(&self, span: jiff::SignedDuration) {
        if let Clock::Manual(now) = self {
            let mut now = now.lock().unwrap();
            *now = now.checked_add(span).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use jiff::SignedDuration;

    use super::*;

    #[test]
    fn test_manual_clock_is_shared_by_clones() {
        let start = Timestamp::from_str("2024-08-10T00:00:00Z").unwrap();
        let clock = Clock::manual(start);
        let observer = clock.clone();

        clock.advance(SignedDuration::from_hours(25));
        assert_eq!(
            observer.now(),
            Timestamp::from_str("2024-08-11T01:00:00Z").unwrap()
        );
    }
}
