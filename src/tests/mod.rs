mod station_tests;
