// Copyright 2020 The Keel Developers
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

//! Logging wrapper to be used throughout all crates in the workspace

use std::cmp::max;
use std::sync::Mutex;

use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::Append;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

use crate::types::{LogLevel, LoggingConfig};

const LOGGING_PATTERN: &str = "{d(%Y%m%d %H:%M:%S%.3f)} {h({l})} {M} - {m}{n}";

/// 32 log files to rotate over by default
const DEFAULT_ROTATE_LOG_FILES: u32 = 32;

lazy_static! {
	/// Static Logging configuration, should only be set once, before first logging call
	pub static ref LOGGING_CONFIG: Mutex<LoggingConfig> = Mutex::new(LoggingConfig::default());
	/// Flag to observe whether logging was explicitly initialized (don't output otherwise)
	static ref WAS_INIT: Mutex<bool> = Mutex::new(false);
}

/// Initialize the logger with the given configuration
pub fn init_logger(config: Option<LoggingConfig>) {
	if let Some(c) = config {
		let mut config_ref = LOGGING_CONFIG.lock().unwrap();
		*config_ref = c.clone();

		let mut was_init_ref = WAS_INIT.lock().unwrap();
		if *was_init_ref {
			return;
		}

		let level_stdout = c.stdout_log_level.to_level_filter();
		let level_file = c.file_log_level.to_level_filter();
		let level_minimum = max(level_stdout, level_file);

		let mut root = Root::builder();
		let mut appenders = vec![];

		if c.log_to_stdout {
			let stdout = ConsoleAppender::builder()
				.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
				.build();

			root = root.appender("stdout");
			appenders.push(
				Appender::builder()
					.filter(Box::new(ThresholdFilter::new(level_stdout)))
					.build("stdout", Box::new(stdout)),
			);
		}

		if c.log_to_file {
			// If maximum log size is specified, use rolling file appender
			// or use basic one otherwise
			let filter = Box::new(ThresholdFilter::new(level_file));
			let file: Box<dyn Append> = if let Some(size) = c.log_max_size {
				let count = c.log_max_files.unwrap_or(DEFAULT_ROTATE_LOG_FILES);
				let roller = FixedWindowRoller::builder()
					.build(&format!("{}.{{}}.gz", c.log_file_path), count)
					.unwrap();
				let trigger = SizeTrigger::new(size);

				let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

				Box::new(
					RollingFileAppender::builder()
						.append(c.log_file_append)
						.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
						.build(c.log_file_path.clone(), Box::new(policy))
						.unwrap(),
				)
			} else {
				Box::new(
					FileAppender::builder()
						.append(c.log_file_append)
						.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
						.build(c.log_file_path.clone())
						.unwrap(),
				)
			};

			root = root.appender("file");
			appenders.push(Appender::builder().filter(filter).build("file", file));
		}

		let config = Config::builder()
			.appenders(appenders)
			.build(root.build(level_minimum))
			.unwrap();

		log4rs::init_config(config).unwrap();

		info!(
			"log4rs is initialized, file level: {:?}, stdout level: {:?}, min. level: {:?}",
			level_file, level_stdout, level_minimum
		);

		*was_init_ref = true;
	}
}

/// Initializes the logger for unit and integration tests
pub fn init_test_logger() {
	let mut was_init_ref = WAS_INIT.lock().unwrap();
	if *was_init_ref {
		return;
	}

	let mut logger = LoggingConfig::default();
	logger.log_to_file = false;
	logger.stdout_log_level = LogLevel::Debug;

	let mut config_ref = LOGGING_CONFIG.lock().unwrap();
	*config_ref = logger.clone();

	let level_stdout = logger.stdout_log_level.to_level_filter();
	let stdout = ConsoleAppender::builder()
		.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
		.build();

	let config = Config::builder()
		.appender(Appender::builder().build("stdout", Box::new(stdout)))
		.build(Root::builder().appender("stdout").build(level_stdout))
		.unwrap();

	// Tests run in one process; a second init attempt is fine to ignore.
	let _ = log4rs::init_config(config);

	*was_init_ref = true;
}
