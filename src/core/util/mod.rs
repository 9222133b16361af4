pub mod duration_util;
