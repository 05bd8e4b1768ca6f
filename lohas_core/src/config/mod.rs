pub mod lohas_config;
