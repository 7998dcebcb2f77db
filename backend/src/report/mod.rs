pub mod csv_sink;
